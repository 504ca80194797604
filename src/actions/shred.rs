//! Secure overwrite before deletion.
//!
//! A file is overwritten in place with random data for the configured
//! number of passes, synced after each pass, truncated, renamed to a random
//! name of the same length and only then unlinked. Any failure before the
//! unlink leaves the file where it is: shredding fails closed.
//!
//! The opened handle is compared with the entry checked just before, so a
//! file swapped for a link in between is refused rather than followed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rand::distr::Alphanumeric;
use rand::{Rng, RngCore};
use thiserror::Error;

use crate::outcome::{FailureKind, RunOutcome, SkipReason};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Error type for shredding.
#[derive(Debug, Error)]
pub enum ShredError {
    /// The file no longer exists.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// The file could not be opened for writing.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path is not a regular file.
    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),

    /// The entry changed between the check and the open.
    #[error("{0} was replaced before it could be opened")]
    Replaced(PathBuf),

    /// Overwriting failed; the file is still on disk.
    #[error("overwrite failed for {path}: {source}")]
    Overwrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The contents were destroyed but the entry could not be removed.
    #[error("could not remove {path} after overwriting: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ShredError {
    fn open_failed(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Overwrite {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// The outcome recorded for this error.
    #[must_use]
    pub fn to_outcome(&self) -> RunOutcome {
        match self {
            Self::NotFound(_) => RunOutcome::Skipped(SkipReason::NotFound),
            Self::NotAFile(_) | Self::Replaced(_) => {
                RunOutcome::Skipped(SkipReason::KindChanged)
            }
            Self::PermissionDenied(_) => {
                RunOutcome::Failed(FailureKind::Permission, self.to_string())
            }
            Self::Overwrite { .. } | Self::Remove { .. } => {
                RunOutcome::Failed(FailureKind::IoDuringShred, self.to_string())
            }
        }
    }
}

/// Something a shredder can overwrite.
pub trait ShredSink: Write + Seek {
    /// Flush data to stable storage.
    fn sync(&mut self) -> io::Result<()>;
    /// Drop all content.
    fn truncate(&mut self) -> io::Result<()>;

    /// Whether this sink writes to the entry described by `checked`.
    ///
    /// Sinks that are not files accept anything.
    fn refers_to(&self, checked: &fs::Metadata) -> io::Result<bool> {
        let _ = checked;
        Ok(true)
    }
}

impl ShredSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self) -> io::Result<()> {
        self.set_len(0)
    }

    fn refers_to(&self, checked: &fs::Metadata) -> io::Result<bool> {
        let opened = self.metadata()?;
        Ok(opened.is_file() && same_entry(&opened, checked))
    }
}

#[cfg(unix)]
fn same_entry(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

// File indexes are not exposed on stable outside unix.
#[cfg(not(unix))]
fn same_entry(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok()
}

/// Overwrites and removes files.
#[derive(Debug, Clone)]
pub struct Shredder {
    passes: u32,
    chunk_size: usize,
}

impl Default for Shredder {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Shredder {
    /// Create a shredder making `passes` overwrite passes (at least one).
    #[must_use]
    pub fn new(passes: u32) -> Self {
        Self {
            passes: passes.max(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the write chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of overwrite passes.
    #[must_use]
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Shred a regular file, returning its original size.
    ///
    /// # Errors
    ///
    /// See [`ShredError`]. On `Overwrite` the file is left in place.
    pub fn shred_file(&self, path: &Path) -> Result<u64, ShredError> {
        self.shred_with(path, |p| OpenOptions::new().write(true).open(p))
    }

    /// Shred `path`, writing through the sink returned by `open`.
    ///
    /// # Errors
    ///
    /// See [`ShredError`].
    pub fn shred_with<S, F>(&self, path: &Path, open: F) -> Result<u64, ShredError>
    where
        S: ShredSink,
        F: FnOnce(&Path) -> io::Result<S>,
    {
        let metadata =
            fs::symlink_metadata(path).map_err(|e| ShredError::open_failed(path, e))?;
        if !metadata.is_file() {
            return Err(ShredError::NotAFile(path.to_path_buf()));
        }
        let size = metadata.len();

        let mut sink = open(path).map_err(|e| ShredError::open_failed(path, e))?;
        let overwrite_failed = |source| ShredError::Overwrite {
            path: path.to_path_buf(),
            source,
        };
        if !sink.refers_to(&metadata).map_err(overwrite_failed)? {
            log::warn!("{} changed after it was checked; not shredding", path.display());
            return Err(ShredError::Replaced(path.to_path_buf()));
        }

        self.overwrite(&mut sink, size).map_err(overwrite_failed)?;
        sink.truncate()
            .and_then(|()| sink.sync())
            .map_err(overwrite_failed)?;
        drop(sink);

        let final_path = obscure_name(path);
        fs::remove_file(&final_path).map_err(|source| ShredError::Remove {
            path: final_path.clone(),
            source,
        })?;

        log::info!(
            "Shredded: {} ({} bytes, {} pass(es))",
            path.display(),
            size,
            self.passes
        );
        Ok(size)
    }

    /// Overwrite the first `len` bytes of `sink` once per pass.
    ///
    /// # Errors
    ///
    /// Returns the first write, seek or sync error.
    pub fn overwrite<S: ShredSink>(&self, sink: &mut S, len: u64) -> io::Result<()> {
        let mut rng = rand::rng();
        let mut buf = vec![0u8; self.chunk_size];

        for pass in 1..=self.passes {
            log::trace!("Overwrite pass {}/{} ({} bytes)", pass, self.passes, len);
            sink.seek(SeekFrom::Start(0))?;

            let mut remaining = len;
            while remaining > 0 {
                let chunk = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
                rng.fill_bytes(&mut buf[..chunk]);
                sink.write_all(&buf[..chunk])?;
                remaining -= chunk as u64;
            }

            sink.flush()?;
            sink.sync()?;
        }
        Ok(())
    }
}

/// Rename `path` to a random name of the same length in the same directory.
///
/// Returns the new path, or the original one if renaming was not possible.
fn obscure_name(path: &Path) -> PathBuf {
    let Some(name) = path.file_name() else {
        return path.to_path_buf();
    };
    let len = name.len().clamp(1, 64);

    for _ in 0..4 {
        let random: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        let candidate = path.with_file_name(random);
        if candidate.symlink_metadata().is_ok() {
            continue;
        }
        match fs::rename(path, &candidate) {
            Ok(()) => return candidate,
            Err(e) => {
                log::debug!("Could not rename {} before removal: {}", path.display(), e);
                break;
            }
        }
    }
    path.to_path_buf()
}
