//! Exclusions and built-in protections hold in both phases.

use std::fs;

use cleanbit::outcome::SkipReason;
use cleanbit::target::TargetId;
use tempfile::TempDir;

use super::common::{cleaner, config, engine, write_file, BROWSER};

#[test]
fn test_user_exclusions_never_become_targets() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/keep.tmp"), 10);
    write_file(&home.path().join("cache/debug.log"), 10);
    write_file(&home.path().join("cache/drop.tmp"), 10);
    write_file(&home.path().join("cache/pinned/inner.tmp"), 10);

    let exclusions = ["~/cache/keep.tmp", "*.log", "~/cache/pinned"];
    let engine = engine(vec![cleaner(BROWSER)], config(home.path(), &exclusions));
    let selection = engine.select(&["browser.cache"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    let targets: Vec<&TargetId> = preview.results.iter().map(|r| &r.target).collect();
    assert_eq!(targets, vec![&TargetId::path(home.path().join("cache/drop.tmp"))]);
    let excluded = preview
        .skipped
        .iter()
        .filter(|s| matches!(s.reason, SkipReason::Excluded(_)))
        .count();
    assert_eq!(excluded, 3);

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.deleted_count(), 1);
    assert!(home.path().join("cache/keep.tmp").exists());
    assert!(home.path().join("cache/debug.log").exists());
    assert!(home.path().join("cache/pinned/inner.tmp").exists());
}

#[test]
fn test_home_directory_itself_is_protected() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("notes.txt"), 10);

    let doc = format!(
        r#"
id = "reckless"

[[option]]
id = "home"
[[option.action]]
kind = "delete_path"
pattern = '{}'
recursive = true
"#,
        home.path().display()
    );
    let engine = engine(vec![cleaner(&doc)], config(home.path(), &[]));
    let selection = engine.select(&["reckless.home"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    assert!(preview
        .results
        .iter()
        .all(|r| r.target != TargetId::path(home.path())));
    assert!(preview
        .skipped
        .iter()
        .any(|s| matches!(&s.reason, SkipReason::Excluded(why) if why.contains("critical"))));

    engine.commit(&selection).unwrap();
    assert!(home.path().is_dir());
}

#[test]
fn test_system_paths_are_refused() {
    let home = TempDir::new().unwrap();
    let doc = r#"
id = "system"

[[option]]
id = "etc"
[[option.action]]
kind = "delete_path"
pattern = "/etc/hostname"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["system.etc"]).unwrap();
    let preview = engine.preview(&selection).unwrap();

    assert!(preview.results.is_empty());
    if fs::symlink_metadata("/etc/hostname").is_ok() {
        assert!(matches!(
            preview.skipped[0].reason,
            SkipReason::Excluded(_)
        ));
    }
}

#[test]
fn test_unresolved_variable_is_recorded() {
    let home = TempDir::new().unwrap();
    let doc = r#"
id = "vars"

[[option]]
id = "missing"
[[option.action]]
kind = "delete_path"
pattern = "$CLEANBIT_SURELY_UNDEFINED/cache/*"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["vars.missing"]).unwrap();
    let preview = engine.preview(&selection).unwrap();

    assert!(preview.results.is_empty());
    assert!(matches!(
        &preview.skipped[0].reason,
        SkipReason::UnresolvedVariable(name) if name.contains("CLEANBIT_SURELY_UNDEFINED")
    ));
}

#[cfg(unix)]
#[test]
fn test_ancestor_swapped_for_link_after_preview_is_refused() {
    let home = TempDir::new().unwrap();
    write_file(&home.path().join("cache/sub/a.tmp"), 10);
    let victim = home.path().join("outside/victim");
    write_file(&victim.join("a.tmp"), 99);

    let doc = r#"
id = "nested"

[[option]]
id = "tmp"
[[option.action]]
kind = "delete_path"
pattern = "~/cache/*/*.tmp"
"#;
    let engine = engine(vec![cleaner(doc)], config(home.path(), &[]));
    let selection = engine.select(&["nested.tmp"]).unwrap();
    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 1);
    assert_eq!(preview.estimated_bytes, 10);

    let sub = home.path().join("cache/sub");
    fs::rename(&sub, home.path().join("cache-sub-moved")).unwrap();
    std::os::unix::fs::symlink(&victim, &sub).unwrap();

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        report.outcomes[0].outcome,
        cleanbit::outcome::RunOutcome::Skipped(SkipReason::OutsideDeclaredRoot)
    );
    assert!(victim.join("a.tmp").exists());
    assert_eq!(report.bytes_freed(), 0);
}
