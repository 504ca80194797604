//! Snapshot of files currently held open by running processes.
//!
//! On Linux this reads the `/proc/<pid>/fd` symlinks. Processes we are not
//! allowed to inspect are silently ignored. Other platforms get an empty
//! snapshot.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::normalize::comparison_path;

/// Set of open file paths, taken once per run.
#[derive(Debug, Clone, Default)]
pub struct OpenFiles {
    paths: HashSet<PathBuf>,
}

impl OpenFiles {
    /// Take a snapshot of the open files on this system.
    #[must_use]
    pub fn snapshot() -> Self {
        let open = Self::from_paths(scan());
        log::debug!("Open file snapshot: {} path(s)", open.len());
        open
    }

    /// Build a snapshot from known paths.
    #[must_use]
    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        Self {
            paths: paths.into_iter().map(|p| comparison_path(&p)).collect(),
        }
    }

    /// Whether `path` was open when the snapshot was taken.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(&comparison_path(path))
    }

    /// Number of distinct open paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(target_os = "linux")]
fn scan() -> Vec<PathBuf> {
    let Ok(procs) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    for entry in procs.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(target) = std::fs::read_link(fd.path()) {
                if target.is_absolute() {
                    paths.push(target);
                }
            }
        }
    }
    paths
}

#[cfg(not(target_os = "linux"))]
fn scan() -> Vec<PathBuf> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paths_contains() {
        let open = OpenFiles::from_paths([PathBuf::from("/var/lib/app/db.sqlite")]);
        assert!(open.contains(Path::new("/var/lib/app/db.sqlite")));
        assert!(!open.contains(Path::new("/var/lib/app/other")));
        assert_eq!(open.len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_snapshot_sees_our_own_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("held.txt");
        let _file = std::fs::File::create(&path).unwrap();

        let open = OpenFiles::snapshot();
        let real = std::fs::canonicalize(&path).unwrap();
        assert!(open.contains(&real));
    }
}
