//! Loading rule documents from directories.

use std::fs;

use cleanbit::definitions::{load_dirs, DefinitionError};
use tempfile::TempDir;

const GOOD: &str = r#"
id = "firefox"
name = "Firefox"

[[option]]
id = "cache"
default = true
[[option.action]]
kind = "delete_path"
pattern = "~/.mozilla/firefox/*/cache2"
recursive = true

[[option]]
id = "future"
[[option.action]]
kind = "teleport_files"
where = "away"
"#;

#[test]
fn test_load_dirs_mixes_formats_and_rejections() {
    let system = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();

    fs::write(system.path().join("10-firefox.toml"), GOOD).unwrap();
    fs::write(
        system.path().join("20-chrome.json"),
        r#"{"id": "chrome", "options": [{"id": "cache", "actions": [{"kind": "delete_path", "pattern": "~/.cache/chrome/*"}]}]}"#,
    )
    .unwrap();
    fs::write(system.path().join("30-broken.toml"), "id = \n").unwrap();
    fs::write(system.path().join("README.md"), "not a rule").unwrap();
    fs::write(user.path().join("firefox.toml"), GOOD).unwrap();

    let report = load_dirs(&[
        system.path().to_path_buf(),
        user.path().to_path_buf(),
        system.path().join("missing"),
    ]);

    let ids: Vec<&str> = report.cleaners.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["firefox", "chrome"]);
    assert_eq!(report.option_count(), 3);
    assert_eq!(report.rejected.len(), 2);
    assert!(report
        .rejected
        .iter()
        .any(|e| matches!(e, DefinitionError::Syntax { .. })));
    assert!(report
        .rejected
        .iter()
        .any(|e| matches!(e, DefinitionError::DuplicateCleaner { id, .. } if id == "firefox")));

    let future = report.cleaners[0].option("future").unwrap();
    assert!(future.actions.is_empty(), "unknown kinds are dropped");
}
