//! Safety filter.
//!
//! Every candidate passes through [`SafetyFilter::check`] during preview and
//! through [`SafetyFilter::recheck`] again immediately before commit acts on
//! it. Denials are unconditional: there is no override.
//!
//! - [`exclusions`]: critical roots, protected subtrees, user exclusions
//! - [`open_files`]: files held open by running processes
//! - [`processes`]: running-application detection
//! - [`normalize`]: Unicode-aware path comparison

pub mod exclusions;
pub mod normalize;
pub mod open_files;
pub mod processes;

use std::io;
use std::path::Path;

use crate::matcher::pattern::parent_within;
use crate::outcome::SkipReason;
use crate::target::{FsTarget, MatchResult, RegistryTarget, Target, TargetId, TargetKind};

pub use exclusions::{ExclusionError, ExclusionSet};
pub use open_files::OpenFiles;
pub use processes::{ProcessProbe, StaticProbe, SysinfoProbe};

/// Allow/deny decisions for resolved targets.
#[derive(Debug, Clone)]
pub struct SafetyFilter {
    exclusions: ExclusionSet,
    open_files: Option<OpenFiles>,
}

impl SafetyFilter {
    /// Create a filter. `open_files` is `None` when open-file protection is off.
    #[must_use]
    pub fn new(exclusions: ExclusionSet, open_files: Option<OpenFiles>) -> Self {
        Self {
            exclusions,
            open_files,
        }
    }

    /// The exclusion rules in force.
    #[must_use]
    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Decide whether a target may be acted on.
    ///
    /// # Errors
    ///
    /// Returns the skip reason when the target is protected.
    pub fn check(&self, target: &TargetId, kind: TargetKind) -> Result<(), SkipReason> {
        let denial = match target {
            TargetId::Path { path } => FsTarget::new(path, kind)
                .belongs_to_excluded_root(&self.exclusions)
                .or_else(|| self.open_file_denial(path, kind)),
            TargetId::RegistryKey { hive, key_path } => {
                RegistryTarget::key(*hive, key_path, false).belongs_to_excluded_root(&self.exclusions)
            }
            TargetId::RegistryValue {
                hive,
                key_path,
                value_name,
            } => RegistryTarget::value(*hive, key_path, value_name)
                .belongs_to_excluded_root(&self.exclusions),
            TargetId::Command {
                executable, args, ..
            } => self.command_denial(executable, args),
            TargetId::Volume { root } => self.exclusions.check_write(root),
        };

        match denial {
            Some(reason) => {
                log::debug!("Denied {}: {}", target, reason);
                Err(SkipReason::Excluded(reason))
            }
            None => Ok(()),
        }
    }

    /// Re-validate a previewed target immediately before commit.
    ///
    /// Filesystem targets are examined again. The parent must still resolve
    /// below the declared root (an ancestor swapped for a link is
    /// `OutsideDeclaredRoot`), a vanished target is `NotFound`, and one
    /// whose kind changed (e.g. a file replaced by a symlink) is
    /// `KindChanged`.
    ///
    /// # Errors
    ///
    /// Returns the skip reason when the target must not be acted on.
    pub fn recheck(&self, result: &MatchResult) -> Result<(), SkipReason> {
        if let TargetId::Path { path } = &result.target {
            if let Some(root) = &result.root {
                match parent_within(path, root) {
                    Ok(true) => {}
                    Ok(false) => {
                        log::warn!(
                            "{} no longer resolves below {}",
                            path.display(),
                            root.display()
                        );
                        return Err(SkipReason::OutsideDeclaredRoot);
                    }
                    Err(e) => return Err(recheck_error(path, &e)),
                }
            }
            match TargetKind::probe(path) {
                Ok(kind) if kind != result.kind => {
                    log::warn!(
                        "{} changed from {} to {} since preview",
                        path.display(),
                        result.kind,
                        kind
                    );
                    return Err(SkipReason::KindChanged);
                }
                Ok(_) => {}
                Err(e) => return Err(recheck_error(path, &e)),
            }
        }
        self.check(&result.target, result.kind)
    }

    fn open_file_denial(&self, path: &Path, kind: TargetKind) -> Option<String> {
        let open = self.open_files.as_ref()?;
        if kind != TargetKind::File {
            return None;
        }
        let real = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        (open.contains(path) || open.contains(&real)).then(|| "file is open".to_string())
    }

    /// Commands are vetted by their arguments: any absolute path argument
    /// must itself be deletable. The executable is only checked against
    /// user exclusions, since system binaries live in protected trees.
    fn command_denial(&self, executable: &Path, args: &[String]) -> Option<String> {
        self.exclusions.check_user(executable).or_else(|| {
            args.iter()
                .map(Path::new)
                .filter(|p| p.is_absolute())
                .find_map(|p| self.exclusions.check_delete(p))
        })
    }
}

fn recheck_error(path: &Path, err: &io::Error) -> SkipReason {
    match err.kind() {
        io::ErrorKind::NotFound => SkipReason::NotFound,
        io::ErrorKind::PermissionDenied => SkipReason::PermissionDenied,
        _ => {
            log::debug!("Cannot re-inspect {}: {}", path.display(), err);
            SkipReason::NotFound
        }
    }
}
