//! Free space wiping.
//!
//! Filler files are written into a hidden temporary directory under the
//! requested root until the volume reports it is full, the configured limit
//! is reached or the run is cancelled. The filler is then removed, so the
//! net effect on the volume is nil apart from previously freed blocks now
//! holding random data.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use sysinfo::Disks;
use thiserror::Error;

use crate::outcome::{FailureKind, RunOutcome, SkipReason};
use crate::signal::CancelToken;

const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
/// Stay below the FAT32 single-file limit.
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024 * 1024 - 1;

/// Error type for wiping.
#[derive(Debug, Error)]
pub enum WipeError {
    /// The root is not an existing directory.
    #[error("cannot wipe {0}: not a directory")]
    NotADirectory(PathBuf),

    /// The filler directory or a filler file could not be created.
    #[error("cannot create filler under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing failed for a reason other than running out of space.
    #[error("write failed under {root}: {source}")]
    Write {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The filler could not be removed afterwards.
    #[error("could not remove filler under {root}: {source}")]
    Cleanup {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WipeError {
    /// The outcome recorded for this error.
    #[must_use]
    pub fn to_outcome(&self) -> RunOutcome {
        match self {
            Self::NotADirectory(_) => RunOutcome::Skipped(SkipReason::NotFound),
            Self::Create { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
                RunOutcome::Failed(FailureKind::Permission, self.to_string())
            }
            _ => RunOutcome::Failed(FailureKind::Io, self.to_string()),
        }
    }
}

/// Available bytes on the volume holding `root`, if the volume is known.
#[must_use]
pub fn available_space(root: &Path) -> Option<u64> {
    let target = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<(PathBuf, u64)> = disks
        .list()
        .iter()
        .map(|d| (d.mount_point().to_path_buf(), d.available_space()))
        .collect();
    select_mount(&target, &mounts)
}

/// The entry with the longest mount point containing `target`.
fn select_mount(target: &Path, mounts: &[(PathBuf, u64)]) -> Option<u64> {
    mounts
        .iter()
        .filter(|(mount, _)| target.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| *available)
}

enum Stop {
    VolumeFull,
    FileFull,
    Limit,
    Cancelled,
}

/// Writes and releases filler files.
#[derive(Debug, Clone)]
pub struct Wiper {
    chunk_size: usize,
    limit: Option<u64>,
}

impl Default for Wiper {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Wiper {
    /// Create a wiper writing at most `limit` bytes (unbounded if `None`).
    #[must_use]
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            limit,
        }
    }

    /// Set the write chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Bytes a wipe of a volume with `available` free bytes would write.
    #[must_use]
    pub fn planned_bytes(&self, available: u64) -> u64 {
        self.limit.map_or(available, |limit| limit.min(available))
    }

    /// Fill free space under `root`, then remove the filler.
    ///
    /// Returns the number of bytes written. Cancellation stops writing
    /// early; the filler is still removed and the bytes so far reported.
    ///
    /// # Errors
    ///
    /// See [`WipeError`]. The filler directory is removed on error too.
    pub fn wipe(&self, root: &Path, cancel: &CancelToken) -> Result<u64, WipeError> {
        if !root.is_dir() {
            return Err(WipeError::NotADirectory(root.to_path_buf()));
        }
        let create_failed = |source| WipeError::Create {
            root: root.to_path_buf(),
            source,
        };

        let dir = tempfile::Builder::new()
            .prefix(".cleanbit-wipe")
            .tempdir_in(root)
            .map_err(create_failed)?;

        let mut buf = vec![0u8; self.chunk_size];
        rand::rng().fill_bytes(&mut buf);

        let mut written = 0u64;
        for index in 0.. {
            let path = dir.path().join(format!("fill{index:05}"));
            let mut file = match File::create(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::StorageFull => break,
                Err(e) => return Err(create_failed(e)),
            };

            let (bytes, stop) = self
                .fill(&mut file, &buf, written, cancel)
                .map_err(|source| WipeError::Write {
                    root: root.to_path_buf(),
                    source,
                })?;
            written += bytes;

            if let Err(e) = file.sync_all() {
                log::debug!("Sync of {} failed: {}", path.display(), e);
            }
            match stop {
                Stop::FileFull => continue,
                Stop::VolumeFull | Stop::Limit | Stop::Cancelled => break,
            }
        }

        dir.close().map_err(|source| WipeError::Cleanup {
            root: root.to_path_buf(),
            source,
        })?;

        log::info!("Wiped free space under {} ({} bytes)", root.display(), written);
        Ok(written)
    }

    /// Write one filler file until something stops it.
    fn fill(
        &self,
        file: &mut File,
        buf: &[u8],
        already: u64,
        cancel: &CancelToken,
    ) -> io::Result<(u64, Stop)> {
        let mut in_file = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Ok((in_file, Stop::Cancelled));
            }
            let budget = self
                .limit
                .map_or(u64::MAX, |limit| limit.saturating_sub(already + in_file));
            if budget == 0 {
                return Ok((in_file, Stop::Limit));
            }
            let room = MAX_FILE_SIZE - in_file;
            if room == 0 {
                return Ok((in_file, Stop::FileFull));
            }

            let want = usize::try_from(budget.min(room)).map_or(buf.len(), |n| n.min(buf.len()));
            match file.write(&buf[..want]) {
                Ok(0) => return Ok((in_file, Stop::VolumeFull)),
                Ok(n) => in_file += n as u64,
                Err(e) if e.kind() == io::ErrorKind::StorageFull => {
                    return Ok((in_file, Stop::VolumeFull))
                }
                Err(e) if e.kind() == io::ErrorKind::FileTooLarge => {
                    return Ok((in_file, Stop::FileFull))
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}
