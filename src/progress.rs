//! Progress reporting using indicatif.
//!
//! The engine reports through [`ProgressCallback`]; [`Progress`] renders
//! those events as terminal progress bars for the CLI.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name for preview expansion.
pub const PHASE_PREVIEW: &str = "preview";
/// Phase name for commit.
pub const PHASE_COMMIT: &str = "commit";

/// Progress callback for the preview and commit phases.
///
/// Implement this trait to receive progress updates from the engine.
/// Callbacks may be invoked from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - [`PHASE_PREVIEW`] or [`PHASE_COMMIT`]
    /// * `total` - Number of units in the phase: actions for preview,
    ///   targets for commit
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called after each unit.
    ///
    /// # Arguments
    ///
    /// * `current` - Units done so far (1-based)
    /// * `label` - Option key or target just handled
    fn on_progress(&self, current: usize, label: &str);

    /// Called after a commit item, with the bytes it freed.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    preview: Mutex<Option<ProgressBar>>,
    commit: Mutex<Option<ProgressBar>>,
    freed: Mutex<u64>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use cleanbit::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            preview: Mutex::new(None),
            commit: Mutex::new(None),
            freed: Mutex::new(0),
            quiet,
        }
    }

    fn preview_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn commit_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn active(&self) -> Option<ProgressBar> {
        [&self.commit, &self.preview]
            .into_iter()
            .find_map(|slot| slot.lock().ok().and_then(|guard| guard.clone()))
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = self.multi.add(ProgressBar::new(total as u64));
        let slot = if phase == PHASE_COMMIT {
            pb.set_style(Self::commit_style());
            pb.set_message("Cleaning");
            if let Ok(mut freed) = self.freed.lock() {
                *freed = 0;
            }
            &self.commit
        } else {
            pb.set_style(Self::preview_style());
            pb.set_message("Scanning");
            pb.enable_steady_tick(Duration::from_millis(100));
            &self.preview
        };
        if let Ok(mut guard) = slot.lock() {
            *guard = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, label: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(label, 40));
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        if let Ok(mut freed) = self.freed.lock() {
            *freed += bytes;
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let (slot, message) = if phase == PHASE_COMMIT {
            let freed = self.freed.lock().map_or(0, |f| *f);
            (
                &self.commit,
                format!("Done, {} freed", bytesize::ByteSize::b(freed)),
            )
        } else {
            (&self.preview, "Scan complete".to_string())
        };
        if let Some(pb) = slot.lock().ok().and_then(|mut guard| guard.take()) {
            pb.finish_with_message(message);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
