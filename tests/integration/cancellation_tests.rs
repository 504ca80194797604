//! Cancellation stops a commit at the next item boundary.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cleanbit::engine::{Engine, EngineError, EngineState};
use cleanbit::error::ExitCode;
use cleanbit::outcome::{RunOutcome, SkipReason};
use cleanbit::progress::{ProgressCallback, PHASE_COMMIT};
use cleanbit::safety::StaticProbe;
use cleanbit::signal::CancelToken;
use tempfile::TempDir;

use super::common::{cleaner, config, write_file, BROWSER};

/// Cancels the token after `after` commit items have completed.
struct CancelAfter {
    token: CancelToken,
    after: usize,
    committing: AtomicBool,
    completed: AtomicUsize,
}

impl ProgressCallback for CancelAfter {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        self.committing.store(phase == PHASE_COMMIT, Ordering::SeqCst);
    }

    fn on_progress(&self, _current: usize, _label: &str) {}

    fn on_item_completed(&self, _bytes: u64) {
        if !self.committing.load(Ordering::SeqCst) {
            return;
        }
        if self.completed.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.token.cancel();
        }
    }

    fn on_phase_end(&self, _phase: &str) {}
}

fn cancelling_engine(home: &TempDir, after: usize) -> Engine {
    let token = CancelToken::new();
    let progress = Arc::new(CancelAfter {
        token: token.clone(),
        after,
        committing: AtomicBool::new(false),
        completed: AtomicUsize::new(0),
    });
    Engine::new(vec![cleaner(BROWSER)], config(home.path(), &[]))
        .unwrap()
        .with_probe(StaticProbe::none())
        .with_cancel_token(token)
        .with_progress(progress)
}

#[test]
fn test_cancel_during_commit_is_bounded() {
    let home = TempDir::new().unwrap();
    for i in 0..5 {
        write_file(&home.path().join(format!("cache/{i}.tmp")), 10);
    }

    let engine = cancelling_engine(&home, 1);
    let selection = engine.select(&["browser.cache"]).unwrap();
    let report = engine.commit(&selection).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.outcomes.len(), 5, "every planned item has an outcome");
    assert_eq!(report.deleted_count(), 1);
    let cancelled = report
        .outcomes
        .iter()
        .filter(|r| r.outcome == RunOutcome::Skipped(SkipReason::Cancelled))
        .count();
    assert_eq!(cancelled, 4);

    let remaining = std::fs::read_dir(home.path().join("cache")).unwrap().count();
    assert_eq!(remaining, 4);
    assert_eq!(ExitCode::for_run(&report, false), ExitCode::Interrupted);
    assert_eq!(engine.state(), EngineState::Done);
}

#[test]
fn test_cancelled_preview_keeps_nothing_pending() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/a.tmp"), 10);

    let engine = Engine::new(vec![cleaner(BROWSER)], config(home.path(), &[]))
        .unwrap()
        .with_probe(StaticProbe::none());
    let selection = engine.select(&["browser.cache"]).unwrap();

    // Preview resets the token on entry, so cancel from inside the run.
    struct CancelOnStart(CancelToken);
    impl ProgressCallback for CancelOnStart {
        fn on_phase_start(&self, _phase: &str, _total: usize) {
            self.0.cancel();
        }
        fn on_progress(&self, _current: usize, _label: &str) {}
        fn on_phase_end(&self, _phase: &str) {}
    }
    let token = engine.cancel_token();
    let engine = engine.with_progress(Arc::new(CancelOnStart(token)));

    assert!(matches!(
        engine.preview(&selection),
        Err(EngineError::Cancelled)
    ));
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(home.path().join("cache/a.tmp").exists());
}
