//! Commit-time re-checks: the filesystem may change after preview.

use std::fs;

use cleanbit::engine::{EngineError, EngineState};
use cleanbit::error::ExitCode;
use cleanbit::outcome::{FailureKind, RunOutcome, SkipReason};
use tempfile::TempDir;

use super::common::{cleaner, config, engine, write_file, BROWSER};

#[test]
fn test_vanished_file_is_skipped_not_failed() {
    let home = TempDir::new().unwrap();
    let a = home.path().join("cache/a.tmp");
    let b = home.path().join("cache/b.tmp");
    write_file(&a, 100);
    write_file(&b, 200);

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();
    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 2);

    fs::remove_file(&a).unwrap();

    let report = engine.commit(&selection).unwrap();
    let outcome_for = |name: &str| {
        report
            .outcomes
            .iter()
            .find(|r| r.target.to_string().ends_with(name))
            .map(|r| r.outcome.clone())
            .unwrap()
    };
    assert_eq!(outcome_for("a.tmp"), RunOutcome::Skipped(SkipReason::NotFound));
    assert_eq!(outcome_for("b.tmp"), RunOutcome::Deleted(200));
    assert_eq!(report.state, EngineState::Done);
    assert!(!report.has_failures());
    assert_eq!(ExitCode::for_run(&report, false), ExitCode::Success);
}

#[test]
fn test_kind_change_since_preview_is_skipped() {
    let home = TempDir::new().unwrap();
    let target = home.path().join("cache/entry");
    write_file(&target, 10);

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();
    engine.preview(&selection).unwrap();

    fs::remove_file(&target).unwrap();
    fs::create_dir(&target).unwrap();
    write_file(&target.join("inner.txt"), 10);

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        report.outcomes[0].outcome,
        RunOutcome::Skipped(SkipReason::KindChanged)
    );
    assert!(target.join("inner.txt").exists());
}

#[test]
fn test_commit_without_preview_resolves_fresh() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/a.tmp"), 42);

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.bytes_freed(), 42);
    assert!(report.finished_at >= report.started_at);
}

#[test]
fn test_files_created_after_preview_are_not_touched() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/old.tmp"), 1);

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();
    engine.preview(&selection).unwrap();

    let late = home.path().join("cache/new.tmp");
    write_file(&late, 1);

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.deleted_count(), 1);
    assert!(late.exists());
}

#[test]
fn test_discard_drops_pending_preview() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/a.tmp"), 1);

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();
    engine.preview(&selection).unwrap();
    engine.discard();
    assert_eq!(engine.state(), EngineState::Idle);

    write_file(&home.path().join("cache/b.tmp"), 1);
    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.deleted_count(), 2, "a discarded preview is not reused");
}

#[test]
fn test_unknown_selection_is_rejected() {
    let home = TempDir::new().unwrap();
    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));

    let err = engine.select(&["browser.cahce"]).unwrap_err();
    assert!(matches!(
        &err,
        EngineError::UnknownOption { suggestion: Some(s), .. } if s == "browser.cache"
    ));
    let err = anyhow::Error::new(err);
    assert_eq!(ExitCode::for_error(&err), ExitCode::InvalidSelection);
}

#[cfg(unix)]
#[test]
fn test_symlink_is_removed_not_followed() {
    let home = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let precious = outside.path().join("precious.txt");
    write_file(&precious, 50);
    fs::create_dir_all(home.path().join("cache")).unwrap();
    let link = home.path().join("cache/link");
    std::os::unix::fs::symlink(&precious, &link).unwrap();

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();
    let report = engine.commit(&selection).unwrap();

    assert_eq!(report.deleted_count(), 1);
    assert!(fs::symlink_metadata(&link).is_err());
    assert!(precious.exists());
    assert_eq!(fs::metadata(&precious).unwrap().len(), 50);
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_escaping_root_is_skipped() {
    let home = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    write_file(&outside.path().join("victim.tmp"), 10);
    fs::create_dir_all(home.path().join("cache")).unwrap();
    std::os::unix::fs::symlink(outside.path(), home.path().join("cache/escape")).unwrap();

    let doc = r#"
id = "deep"

[[option]]
id = "tmp"
[[option.action]]
kind = "delete_path"
pattern = "~/cache/*/*.tmp"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["deep.tmp"]).unwrap();
    let preview = engine.preview(&selection).unwrap();

    assert!(preview.results.is_empty());
    assert!(preview
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::OutsideDeclaredRoot));

    engine.commit(&selection).unwrap();
    assert!(outside.path().join("victim.tmp").exists());
}

#[cfg(unix)]
#[test]
fn test_failing_command_leaves_run_partially_failed() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("cache/a.tmp");
    write_file(&file, 40);

    let doc = r#"
id = "maint"

[[option]]
id = "mixed"
[[option.action]]
kind = "delete_path"
pattern = "~/cache/*.tmp"
[[option.action]]
kind = "run_command"
executable = "false"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["maint.mixed"]).unwrap();
    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 2);

    let report = engine.commit(&selection).unwrap();
    let deleted = report
        .outcomes
        .iter()
        .find(|r| r.target.to_string().ends_with("a.tmp"))
        .unwrap();
    assert_eq!(deleted.outcome, RunOutcome::Deleted(40));
    let command = report
        .outcomes
        .iter()
        .find(|r| r.target.to_string().contains("false"))
        .unwrap();
    assert!(matches!(
        command.outcome,
        RunOutcome::Failed(FailureKind::ExternalCommand, _)
    ));

    assert!(!file.exists());
    assert_eq!(report.state, EngineState::PartialFailure);
    assert_eq!(engine.state(), EngineState::PartialFailure);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.bytes_freed(), 40);
    assert_eq!(ExitCode::for_run(&report, false), ExitCode::PartialFailure);
}

#[cfg(unix)]
#[test]
fn test_shred_that_cannot_remove_is_reported_as_failure() {
    use std::os::unix::fs::PermissionsExt;

    let home = TempDir::new().unwrap();
    let vault = home.path().join("vault");
    let secret = vault.join("secret.db");
    let spare = home.path().join("cache/a.tmp");
    write_file(&secret, 64);
    write_file(&spare, 8);

    let doc = r#"
id = "private"

[[option]]
id = "vault"
[[option.action]]
kind = "shred_path"
pattern = "~/vault/*.db"
[[option.action]]
kind = "delete_path"
pattern = "~/cache/*.tmp"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["private.vault"]).unwrap();
    engine.preview(&selection).unwrap();

    // The file stays writable, but its directory no longer allows unlinking.
    fs::set_permissions(&vault, fs::Permissions::from_mode(0o555)).unwrap();
    if fs::write(vault.join("privileged"), b"").is_ok() {
        // Running with permission checks bypassed; nothing to observe.
        fs::set_permissions(&vault, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = engine.commit(&selection);
    fs::set_permissions(&vault, fs::Permissions::from_mode(0o755)).unwrap();
    let report = report.unwrap();

    let shredded = report
        .outcomes
        .iter()
        .find(|r| r.target.to_string().ends_with("secret.db"))
        .unwrap();
    assert!(
        matches!(
            shredded.outcome,
            RunOutcome::Failed(FailureKind::IoDuringShred, _)
        ),
        "{:?}",
        shredded.outcome
    );
    assert!(secret.exists(), "entry is still on disk");
    assert_eq!(fs::metadata(&secret).unwrap().len(), 0, "contents destroyed");
    assert!(!spare.exists());

    assert_eq!(report.state, EngineState::PartialFailure);
    assert_eq!(ExitCode::for_run(&report, false), ExitCode::PartialFailure);
}
