//! Shared fixtures for engine integration tests.

use std::fs;
use std::path::Path;

use cleanbit::definitions::{parse_cleaner, Cleaner, DocumentFormat};
use cleanbit::engine::{Engine, EngineConfig};
use cleanbit::matcher::HostEnvironment;
use cleanbit::safety::{ExclusionSet, StaticProbe};

/// Write a file of exactly `size` bytes, creating parent directories.
pub fn write_file(path: &Path, size: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0xA5u8; size]).unwrap();
}

/// Parse a TOML cleaner definition, failing the test on any rejection.
pub fn cleaner(toml: &str) -> Cleaner {
    let parsed = parse_cleaner(toml, DocumentFormat::Toml, Path::new("test.toml")).unwrap();
    assert!(parsed.rejected_options.is_empty(), "{:?}", parsed.rejected_options);
    parsed.cleaner
}

/// Engine config rooted at `home`, with built-in protections and the given
/// user exclusions.
pub fn config(home: &Path, exclusions: &[&str]) -> EngineConfig {
    let env = HostEnvironment::new(home);
    let mut config = EngineConfig::new(env.clone());
    config.exclusions = ExclusionSet::builtin(&env)
        .with_user_rules(exclusions, &env)
        .unwrap();
    config.protect_open_files = false;
    config
}

/// Engine over `cleaners` with nothing reported as running.
pub fn engine(cleaners: Vec<Cleaner>, config: EngineConfig) -> Engine {
    Engine::new(cleaners, config)
        .unwrap()
        .with_probe(StaticProbe::none())
}

pub const BROWSER: &str = r#"
id = "browser"
name = "Browser"
running = ["cleanbit-test-browser"]

[[option]]
id = "cache"
label = "Cache"
default = true

[[option.action]]
kind = "delete_path"
pattern = "~/cache/*"
"#;
