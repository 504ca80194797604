//! Permanent removal of files, links and empty directories.
//!
//! Removal never recurses: a directory is only removed once it is empty.
//! Recursive cleaning works because expansion emits every directory after
//! its contents, so by the time a directory is reached everything deletable
//! below it is already gone, and anything protected keeps it in place.
//!
//! # Example
//!
//! ```no_run
//! use cleanbit::actions::delete::remove_path;
//! use cleanbit::target::TargetKind;
//! use std::path::Path;
//!
//! match remove_path(Path::new("/tmp/stale.lock"), TargetKind::File) {
//!     Ok(result) => println!("Freed {} bytes", result.size),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::outcome::{FailureKind, RunOutcome, SkipReason};
use crate::target::TargetKind;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Target was not found (already removed by someone else).
    #[error("not found: {0}")]
    NotFound(String),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Directory still has entries.
    #[error("directory not empty: {0}")]
    NotEmpty(String),

    /// The operation is not available on this platform.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Any other I/O error.
    #[error("I/O error for {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Classify an I/O error for the given target label.
    #[must_use]
    pub fn from_io(target: String, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(target),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(target),
            io::ErrorKind::DirectoryNotEmpty => Self::NotEmpty(target),
            io::ErrorKind::Unsupported => Self::Unsupported(target),
            _ => Self::Io { target, source },
        }
    }

    fn from_path(path: &Path, source: io::Error) -> Self {
        Self::from_io(path.display().to_string(), source)
    }

    /// The target this error refers to.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::NotFound(t)
            | Self::PermissionDenied(t)
            | Self::NotEmpty(t)
            | Self::Unsupported(t)
            | Self::Io { target: t, .. } => t,
        }
    }

    /// The outcome recorded for this error.
    #[must_use]
    pub fn to_outcome(&self) -> RunOutcome {
        match self {
            Self::NotFound(_) => RunOutcome::Skipped(SkipReason::NotFound),
            Self::NotEmpty(_) => RunOutcome::Skipped(SkipReason::NotEmpty),
            Self::Unsupported(_) => RunOutcome::Skipped(SkipReason::Unsupported),
            Self::PermissionDenied(_) => {
                RunOutcome::Failed(FailureKind::Permission, self.to_string())
            }
            Self::Io { .. } => RunOutcome::Failed(FailureKind::Io, self.to_string()),
        }
    }
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Bytes freed.
    pub size: u64,
}

/// Bytes removing `path` would free.
///
/// Files and links count their own length, directories count zero: their
/// contents are separate targets.
///
/// # Errors
///
/// Returns an error if the metadata cannot be read.
pub fn size_on_disk(path: &Path, kind: TargetKind) -> Result<u64, DeleteError> {
    match kind {
        TargetKind::File | TargetKind::Symlink => fs::symlink_metadata(path)
            .map(|m| m.len())
            .map_err(|e| DeleteError::from_path(path, e)),
        _ => Ok(0),
    }
}

/// Permanently remove a file, link or empty directory.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the path no longer exists
/// - `NotEmpty` for a directory that still has entries
/// - `PermissionDenied` or `Io` if the removal fails
pub fn remove_path(path: &Path, kind: TargetKind) -> Result<DeleteResult, DeleteError> {
    let size = size_on_disk(path, kind)?;

    let removed = match kind {
        TargetKind::File | TargetKind::Symlink => remove_file_or_link(path),
        TargetKind::Directory => fs::remove_dir(path),
        other => {
            return Err(DeleteError::Unsupported(format!(
                "{} is a {other}, not a filesystem entry",
                path.display()
            )))
        }
    };

    removed.map_err(|e| {
        let err = DeleteError::from_path(path, e);
        if matches!(err, DeleteError::NotEmpty(_)) {
            log::debug!("Kept non-empty directory {}", path.display());
        } else {
            log::warn!("Delete failed for {}: {}", path.display(), err);
        }
        err
    })?;

    log::info!("Deleted: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
    })
}

/// Windows links to directories must be removed with `remove_dir`.
fn remove_file_or_link(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if cfg!(windows) && fs::metadata(path).is_ok_and(|m| m.is_dir()) => {
            log::debug!("Retrying {} as a directory link: {}", path.display(), e);
            fs::remove_dir(path)
        }
        other => other,
    }
}
