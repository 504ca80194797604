//! Resolved targets.
//!
//! A [`MatchResult`] is what preview hands to commit: one concrete path,
//! registry entry, command or volume, tagged with its kind and the option
//! that produced it. Filesystem and registry targets share the [`Target`]
//! trait so size estimation and removal go through one code path in both
//! phases.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::actions::command::OutputRules;
use crate::actions::delete::{self, DeleteError};
use crate::definitions::OptionKey;
use crate::matcher::registry::{self, Hive};
use crate::safety::ExclusionSet;

/// Kind of a resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (never followed).
    Symlink,
    /// Registry key.
    RegistryKey,
    /// Registry value.
    RegistryValue,
    /// External command.
    Command,
    /// Free space of a volume.
    FreeSpace,
}

impl TargetKind {
    /// Classify filesystem metadata obtained without following links.
    #[must_use]
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        let ft = metadata.file_type();
        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }

    /// Probe the kind of a path without following links.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, e.g. `NotFound`.
    pub fn probe(path: &Path) -> io::Result<Self> {
        fs::symlink_metadata(path).map(|m| Self::from_metadata(&m))
    }

    /// Whether this kind lives on the filesystem.
    #[must_use]
    pub fn is_filesystem(self) -> bool {
        matches!(self, Self::File | Self::Directory | Self::Symlink)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::RegistryKey => "registry_key",
            Self::RegistryValue => "registry_value",
            Self::Command => "command",
            Self::FreeSpace => "free_space",
        };
        f.write_str(name)
    }
}

/// Identity of a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetId {
    /// Filesystem path.
    Path { path: PathBuf },
    /// Registry key.
    RegistryKey { hive: Hive, key_path: String },
    /// Registry value.
    RegistryValue {
        hive: Hive,
        key_path: String,
        value_name: String,
    },
    /// Command line, executable already resolved.
    Command {
        executable: PathBuf,
        args: Vec<String>,
        /// How the command's output is read at commit.
        #[serde(skip)]
        output: OutputRules,
    },
    /// Volume holding the given directory.
    Volume { root: PathBuf },
}

impl TargetId {
    /// Shorthand for a path target.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    /// The filesystem path, for path targets.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path { path } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { path } => write!(f, "{}", path.display()),
            Self::RegistryKey { hive, key_path } => write!(f, "{hive}\\{key_path}"),
            Self::RegistryValue {
                hive,
                key_path,
                value_name,
            } => write!(f, "{hive}\\{key_path} [{value_name}]"),
            Self::Command {
                executable, args, ..
            } => {
                write!(f, "{}", executable.display())?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Self::Volume { root } => write!(f, "free space of {}", root.display()),
        }
    }
}

/// What commit does with a target.
///
/// Ordered by strength: when two options plan the same target the stronger
/// disposition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Run the command.
    Execute,
    /// Fill and release free space.
    Wipe,
    /// Remove the target. Directories only if empty, registry keys only
    /// if they have no subkeys.
    Delete,
    /// Remove a registry key with all its subkeys.
    DeleteTree,
    /// Overwrite, then remove.
    Shred,
}

/// A target that passed the safety filter during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// Option that produced the target.
    pub option: OptionKey,
    /// Index of the producing action within the option.
    pub action_index: usize,
    /// The target.
    pub target: TargetId,
    /// Kind observed at resolution time.
    pub kind: TargetKind,
    /// Estimated bytes reclaimed (or, for free space, bytes to be written).
    pub bytes: u64,
    /// How commit handles it.
    pub disposition: Disposition,
    /// Real location of the declared root, for path targets. Commit
    /// refuses any target whose parent no longer resolves below it.
    pub root: Option<PathBuf>,
}

impl MatchResult {
    /// Path depth used for contents-first ordering; zero for non-paths.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.target
            .as_path()
            .map_or(0, |p| p.components().count())
    }
}

/// Operations shared by filesystem and registry targets.
pub trait Target {
    /// Bytes that removing the target would free.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be inspected.
    fn estimate_size(&self) -> Result<u64, DeleteError>;

    /// Remove the target, returning the bytes freed.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be removed.
    fn delete(&self) -> Result<u64, DeleteError>;

    /// Reason the target is protected, if it is.
    fn belongs_to_excluded_root(&self, exclusions: &ExclusionSet) -> Option<String>;
}

/// A path on the filesystem.
#[derive(Debug, Clone)]
pub struct FsTarget<'a> {
    path: &'a Path,
    kind: TargetKind,
}

impl<'a> FsTarget<'a> {
    /// Wrap a path of known kind.
    #[must_use]
    pub fn new(path: &'a Path, kind: TargetKind) -> Self {
        Self { path, kind }
    }
}

impl Target for FsTarget<'_> {
    fn estimate_size(&self) -> Result<u64, DeleteError> {
        delete::size_on_disk(self.path, self.kind)
    }

    fn delete(&self) -> Result<u64, DeleteError> {
        delete::remove_path(self.path, self.kind).map(|r| r.size)
    }

    fn belongs_to_excluded_root(&self, exclusions: &ExclusionSet) -> Option<String> {
        exclusions.check_delete(self.path)
    }
}

/// A registry key or value.
#[derive(Debug, Clone)]
pub struct RegistryTarget<'a> {
    hive: Hive,
    key_path: &'a str,
    value_name: Option<&'a str>,
    recursive: bool,
}

impl<'a> RegistryTarget<'a> {
    /// A key; `recursive` removes its subkeys too.
    #[must_use]
    pub fn key(hive: Hive, key_path: &'a str, recursive: bool) -> Self {
        Self {
            hive,
            key_path,
            value_name: None,
            recursive,
        }
    }

    /// A single value under a key.
    #[must_use]
    pub fn value(hive: Hive, key_path: &'a str, value_name: &'a str) -> Self {
        Self {
            hive,
            key_path,
            value_name: Some(value_name),
            recursive: false,
        }
    }

    fn label(&self) -> String {
        match self.value_name {
            Some(name) => format!("{}\\{} [{}]", self.hive, self.key_path, name),
            None => format!("{}\\{}", self.hive, self.key_path),
        }
    }
}

impl Target for RegistryTarget<'_> {
    fn estimate_size(&self) -> Result<u64, DeleteError> {
        Ok(0)
    }

    fn delete(&self) -> Result<u64, DeleteError> {
        let result = match self.value_name {
            Some(name) => registry::delete_value(self.hive, self.key_path, name),
            None => registry::delete_key(self.hive, self.key_path, self.recursive),
        };
        result.map(|()| 0).map_err(|source| DeleteError::from_io(self.label(), source))
    }

    fn belongs_to_excluded_root(&self, exclusions: &ExclusionSet) -> Option<String> {
        exclusions.check_registry(self.hive, self.key_path)
    }
}
