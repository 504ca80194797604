//! Free space wiping and shredding through the engine.

use std::fs;

use cleanbit::definitions::Cleaner;
use cleanbit::outcome::RunOutcome;
use cleanbit::target::{Disposition, TargetKind};
use tempfile::TempDir;

use super::common::{cleaner, config, engine, write_file};

#[test]
fn test_wipe_respects_limit_and_cleans_up() {
    let home = TempDir::new().unwrap();
    let volume = TempDir::new().unwrap();
    let doc = format!(
        r#"
id = "disk"

[[option]]
id = "wipe"
[[option.action]]
kind = "wipe_free_space"
root = '{}'
"#,
        volume.path().display()
    );

    let mut config = config(home.path(), &[]);
    config.resolver.wipe_limit = Some(300_000);
    let engine = engine(vec![cleaner(&doc)], config);
    let selection = engine.select(&["disk.wipe"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 1);
    assert_eq!(preview.results[0].kind, TargetKind::FreeSpace);
    assert_eq!(preview.results[0].disposition, Disposition::Wipe);
    assert_eq!(preview.estimated_bytes, 0);
    assert!(preview.free_space_bytes <= 300_000);

    let report = engine.commit(&selection).unwrap();
    assert!(!report.has_failures(), "{:?}", report.outcomes);
    let wiped = report.bytes_wiped();
    assert!(wiped > 0 && wiped <= 300_000, "wiped {wiped}");
    assert_eq!(report.bytes_freed(), 0);
    assert_eq!(
        fs::read_dir(volume.path()).unwrap().count(),
        0,
        "fill files are removed"
    );
}

#[test]
fn test_shred_setting_overwrites_then_removes() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("cache/secret.bin");
    write_file(&file, 10_000);

    let mut config = config(home.path(), &[]);
    config.resolver.shred = true;
    config.resolver.shred_passes = 2;
    let engine = engine(vec![cleaner(super::common::BROWSER)], config);
    let selection = engine.select(&["browser.cache"]).unwrap();

    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results[0].disposition, Disposition::Shred);

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.outcomes[0].outcome, RunOutcome::Deleted(10_000));
    assert!(!file.exists());
    assert_eq!(
        fs::read_dir(home.path().join("cache")).unwrap().count(),
        0,
        "no renamed leftovers"
    );
}

#[test]
fn test_ad_hoc_shred_cleaner() {
    let home = TempDir::new().unwrap();
    let a = home.path().join("docs/a.txt");
    let b = home.path().join("docs/b[1].txt");
    write_file(&a, 123);
    write_file(&b, 77);

    let engine = engine(
        vec![Cleaner::ad_hoc_shred(&[a.clone(), b.clone()])],
        config(home.path(), &[]),
    );
    let selection = engine.default_selection();
    let report = engine.commit(&selection).unwrap();

    assert_eq!(report.deleted_count(), 2);
    assert_eq!(report.bytes_freed(), 200);
    assert!(!a.exists());
    assert!(!b.exists());
}

#[test]
fn test_ad_hoc_shred_names_with_variable_sigils() {
    let home = TempDir::new().unwrap();
    let dollar = home.path().join("docs/a$HOME.txt");
    let percent = home.path().join("docs/50%HOME%.txt");
    write_file(&dollar, 10);
    write_file(&percent, 20);

    let engine = engine(
        vec![Cleaner::ad_hoc_shred(&[dollar.clone(), percent.clone()])],
        config(home.path(), &[]),
    );
    let selection = engine.default_selection();
    let preview = engine.preview(&selection).unwrap();
    assert_eq!(preview.results.len(), 2, "{:?}", preview.skipped);

    let report = engine.commit(&selection).unwrap();
    assert_eq!(report.bytes_freed(), 30);
    assert!(!dollar.exists());
    assert!(!percent.exists());
}
