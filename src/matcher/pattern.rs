//! Filesystem pattern expansion.
//!
//! A declared pattern is expanded in three steps: `~` and variables are
//! substituted from the [`HostEnvironment`], the result is globbed, and
//! recursive matches are walked with `jwalk`. Nothing is followed through a
//! symbolic link: a candidate whose parent resolves outside the pattern's
//! declared root is skipped, and the walker never descends into links.

use std::io;
use std::path::{Component, Path, PathBuf};

use regex::Regex;

use super::{HostEnvironment, MatchError};
use crate::outcome::SkipReason;
use crate::signal::CancelToken;
use crate::target::TargetKind;

/// An existing filesystem entry produced by expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path of the entry.
    pub path: PathBuf,
    /// Kind observed without following links.
    pub kind: TargetKind,
    /// Real location of the pattern's declared root, links resolved.
    pub root: PathBuf,
}

/// Result of expanding one pattern.
#[derive(Debug, Default)]
pub struct Expansion {
    /// Candidates in contents-first order.
    pub candidates: Vec<Candidate>,
    /// Entries that were seen but could not be used.
    pub skipped: Vec<(PathBuf, SkipReason)>,
}

/// A pattern together with its expansion options.
#[derive(Debug, Clone)]
pub struct PathPattern<'a> {
    pattern: &'a str,
    recursive: bool,
    name_filter: Option<Regex>,
}

impl<'a> PathPattern<'a> {
    /// Create a non-recursive pattern without a name filter.
    #[must_use]
    pub fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            recursive: false,
            name_filter: None,
        }
    }

    /// Descend into matched directories.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Keep only candidates whose file name matches `regex`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::InvalidRegex`] if the expression does not compile.
    pub fn with_name_filter(mut self, regex: Option<&str>) -> Result<Self, MatchError> {
        self.name_filter = regex.map(Regex::new).transpose()?;
        Ok(self)
    }

    /// Expand against the filesystem.
    ///
    /// A pattern matching nothing yields an empty expansion, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is unresolved, the expanded pattern is
    /// not an absolute glob, or `cancel` fires.
    pub fn expand(
        &self,
        env: &HostEnvironment,
        cancel: &CancelToken,
    ) -> Result<Expansion, MatchError> {
        let expanded = env.expand(self.pattern)?;
        validate_expanded(&expanded)?;

        let root = declared_root(&expanded);
        let mut canonical_root: Option<PathBuf> = None;
        let mut expansion = Expansion::default();

        let paths = glob::glob_with(&expanded, match_options()).map_err(|e| {
            MatchError::InvalidPattern {
                pattern: expanded.clone(),
                message: e.to_string(),
            }
        })?;

        for entry in paths {
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }

            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    if err.error().kind() == io::ErrorKind::PermissionDenied {
                        expansion
                            .skipped
                            .push((err.path().to_path_buf(), SkipReason::PermissionDenied));
                    } else {
                        log::debug!("Glob error at {}: {}", err.path().display(), err.error());
                    }
                    continue;
                }
            };

            let kind = match TargetKind::probe(&path) {
                Ok(kind) => kind,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    log::debug!("Cannot inspect {}: {}", path.display(), e);
                    expansion.skipped.push((path, SkipReason::PermissionDenied));
                    continue;
                }
            };

            let real_root = match &canonical_root {
                Some(real) => real.clone(),
                None => {
                    let real = canonicalize_root(&root)?;
                    canonical_root = Some(real.clone());
                    real
                }
            };
            match parent_within(&path, &real_root) {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("Outside declared root {}: {}", root.display(), path.display());
                    expansion.skipped.push((path, SkipReason::OutsideDeclaredRoot));
                    continue;
                }
                Err(_) => continue,
            }

            if self.recursive && kind == TargetKind::Directory {
                self.walk_contents_first(&path, &real_root, cancel, &mut expansion)?;
                if self.name_filter.is_none() {
                    expansion.candidates.push(Candidate {
                        path,
                        kind,
                        root: real_root,
                    });
                }
            } else if self.name_matches(&path) {
                expansion.candidates.push(Candidate {
                    path,
                    kind,
                    root: real_root,
                });
            }
        }

        Ok(expansion)
    }

    fn name_matches(&self, path: &Path) -> bool {
        let Some(re) = &self.name_filter else {
            return true;
        };
        path.file_name()
            .map(|n| re.is_match(&n.to_string_lossy()))
            .unwrap_or(false)
    }

    /// Emit everything below `dir`, each directory after its contents.
    ///
    /// With a name filter only matching non-directories are emitted.
    fn walk_contents_first(
        &self,
        dir: &Path,
        root: &Path,
        cancel: &CancelToken,
        expansion: &mut Expansion,
    ) -> Result<(), MatchError> {
        let walker = jwalk::WalkDir::new(dir)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1);

        let mut open_dirs: Vec<PathBuf> = Vec::new();

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }

            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    while let Some(top) = open_dirs.last() {
                        if path.starts_with(top) {
                            break;
                        }
                        if let Some(done) = open_dirs.pop() {
                            self.push_dir(done, root, expansion);
                        }
                    }

                    let ft = entry.file_type();
                    if ft.is_dir() {
                        open_dirs.push(path);
                    } else if self.name_matches(&path) {
                        let kind = if ft.is_symlink() {
                            TargetKind::Symlink
                        } else {
                            TargetKind::File
                        };
                        expansion.candidates.push(Candidate {
                            path,
                            kind,
                            root: root.to_path_buf(),
                        });
                    }
                }
                Err(err) => {
                    let path = err.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                    let denied = err
                        .io_error()
                        .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied);
                    if denied {
                        log::debug!("Permission denied while walking {}", path.display());
                        expansion.skipped.push((path, SkipReason::PermissionDenied));
                    } else {
                        log::debug!("Walk error at {}: {}", path.display(), err);
                    }
                }
            }
        }

        while let Some(done) = open_dirs.pop() {
            self.push_dir(done, root, expansion);
        }
        Ok(())
    }

    fn push_dir(&self, path: PathBuf, root: &Path, expansion: &mut Expansion) {
        if self.name_filter.is_none() {
            expansion.candidates.push(Candidate {
                path,
                kind: TargetKind::Directory,
                root: root.to_path_buf(),
            });
        }
    }
}

fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: !cfg!(windows),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn validate_expanded(expanded: &str) -> Result<(), MatchError> {
    let path = Path::new(expanded);
    if !path.is_absolute() {
        return Err(MatchError::InvalidPattern {
            pattern: expanded.to_string(),
            message: "pattern is not absolute".to_string(),
        });
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(MatchError::InvalidPattern {
            pattern: expanded.to_string(),
            message: "parent directory components are not allowed".to_string(),
        });
    }
    Ok(())
}

/// Literal directory prefix of a pattern, up to the first wildcard.
///
/// A pattern without wildcards is rooted at its parent directory.
#[must_use]
pub fn declared_root(expanded: &str) -> PathBuf {
    let is_sep = |c: char| c == '/' || (cfg!(windows) && c == '\\');

    match expanded.find(&['*', '?', '['][..]) {
        Some(wild) => {
            let prefix = &expanded[..wild];
            match prefix.rfind(is_sep) {
                Some(0) => PathBuf::from(&prefix[..1]),
                Some(sep) => PathBuf::from(&prefix[..sep]),
                None => PathBuf::from("."),
            }
        }
        None => Path::new(expanded)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from(expanded), Path::to_path_buf),
    }
}

fn canonicalize_root(path: &Path) -> Result<PathBuf, MatchError> {
    std::fs::canonicalize(path).map_err(|e| MatchError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Whether the real location of `path`'s parent lies under `canonical_root`.
pub(crate) fn parent_within(path: &Path, canonical_root: &Path) -> io::Result<bool> {
    let Some(parent) = path.parent() else {
        return Ok(false);
    };
    let real_parent = std::fs::canonicalize(parent)?;
    Ok(real_parent.starts_with(canonical_root))
}
