//! End-to-end preview and commit of rule-driven cleaning.

use std::fs;

use cleanbit::engine::EngineState;
use cleanbit::error::ExitCode;
use cleanbit::outcome::RunOutcome;
use cleanbit::target::{Disposition, TargetKind};
use tempfile::TempDir;

use super::common::{cleaner, config, engine, write_file, BROWSER};

#[test]
fn test_browser_cache_preview_commit_preview() {
    let home = TempDir::new().unwrap();
    let cache = home.path().join("cache");
    write_file(&cache.join("a.tmp"), 1024);
    write_file(&cache.join("b.tmp"), 1024);
    write_file(&cache.join("c.tmp"), 2048);

    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &[]));
    let selection = engine.select(&["browser.cache"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 3);
    assert_eq!(preview.estimated_bytes, 4096);
    assert!(preview.skipped.is_empty());
    assert!(preview
        .results
        .iter()
        .all(|r| r.kind == TargetKind::File && r.disposition == Disposition::Delete));
    assert_eq!(engine.state(), EngineState::Previewed);
    assert!(cache.join("a.tmp").exists(), "preview must not touch anything");

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.deleted_count(), 3);
    assert_eq!(report.bytes_freed(), preview.estimated_bytes);
    assert_eq!(report.state, EngineState::Done);
    assert_eq!(ExitCode::for_run(&report, false), ExitCode::Success);
    assert!(cache.is_dir(), "non-recursive pattern keeps the directory");
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);

    let again = engine.preview(&selection).unwrap();
    assert!(again.results.is_empty());
    assert_eq!(again.estimated_bytes, 0);
}

#[test]
fn test_per_option_totals_match_report() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/one.bin"), 300);
    write_file(&home.path().join("logs/app.log"), 700);

    let doc = r#"
id = "app"

[[option]]
id = "cache"
[[option.action]]
kind = "delete_path"
pattern = "~/cache/*"

[[option]]
id = "logs"
[[option.action]]
kind = "delete_path"
pattern = "~/logs/*.log"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["app.*"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    let planned = preview.per_option();
    assert_eq!(planned.len(), 2);

    let report = engine.commit(&selection).unwrap();
    let done = report.per_option();
    for (key, totals) in &planned {
        assert_eq!(done[key].bytes, totals.bytes, "{key}");
        assert_eq!(done[key].targets, totals.targets, "{key}");
    }
    assert_eq!(report.bytes_freed(), 1000);
}

#[test]
fn test_recursive_directory_removed_after_contents() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("thumbs/a/1.png"), 10);
    write_file(&home.path().join("thumbs/a/2.png"), 10);
    write_file(&home.path().join("thumbs/b/3.png"), 10);

    let doc = r#"
id = "thumbnails"

[[option]]
id = "all"
[[option.action]]
kind = "delete_path"
pattern = "~/thumbs"
recursive = true
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["thumbnails.all"]).unwrap();
    let report = engine.commit(&selection).unwrap();

    assert!(!report.has_failures(), "{:?}", report.outcomes);
    assert!(!home.path().join("thumbs").exists());
    assert_eq!(report.bytes_freed(), 30);
    assert!(report
        .outcomes
        .iter()
        .all(|r| matches!(r.outcome, RunOutcome::Deleted(_))));
}

#[test]
fn test_regex_filter_limits_candidates() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("dl/part1.crdownload"), 5);
    write_file(&home.path().join("dl/movie.mkv"), 5);

    let doc = r#"
id = "downloads"

[[option]]
id = "partial"
[[option.action]]
kind = "delete_path"
pattern = "~/dl/*"
regex = '\.crdownload$'
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["downloads.partial"]).unwrap();
    engine.commit(&selection).unwrap();

    assert!(!home.path().join("dl/part1.crdownload").exists());
    assert!(home.path().join("dl/movie.mkv").exists());
}

#[test]
fn test_overlapping_options_shred_wins() {
    let home = TempDir::new().unwrap();
    let secret = home.path().join("data/secret.txt");
    write_file(&secret, 64);

    let doc = r#"
id = "overlap"

[[option]]
id = "plain"
[[option.action]]
kind = "delete_path"
pattern = "~/data/*.txt"

[[option]]
id = "secure"
[[option.action]]
kind = "shred_path"
pattern = "~/data/secret.txt"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["overlap.plain", "overlap.secure"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 2);
    assert_eq!(preview.estimated_bytes, 64, "a shared target counts once");

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.deleted_count(), 1);
    assert_eq!(report.bytes_freed(), 64);
    assert!(!secret.exists());
}

#[test]
fn test_running_application_blocks_cleaner() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/a.tmp"), 10);

    let engine = cleanbit::engine::Engine::new(vec![cleaner(BROWSER)], config(home.path(), &[]))
        .unwrap()
        .with_probe(cleanbit::safety::StaticProbe::running(["cleanbit-test-browser"]));
    let selection = engine.select(&["browser.cache"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    assert!(preview.results.is_empty());
    assert_eq!(preview.skipped.len(), 1);

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.deleted_count(), 0);
    assert!(home.path().join("cache/a.tmp").exists());
}
