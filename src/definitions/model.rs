//! In-memory model of cleaner definitions.
//!
//! A [`Cleaner`] groups the [`CleanerOption`]s for one application, and every
//! option carries an ordered list of declared [`Action`]s. Nothing in this
//! module touches the filesystem: actions are pure declarations until the
//! resolver expands and executes them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::literal_pattern;

/// A named collection of related cleaning options, usually one per application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cleaner {
    /// Identifier, unique across all loaded documents.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description shown next to the name.
    pub description: String,
    /// Warning shown before the cleaner runs, if any.
    pub warning: Option<String>,
    /// Executable names that must not be running while this cleaner runs.
    pub running: Vec<String>,
    /// Ordered cleaning options.
    pub options: Vec<CleanerOption>,
}

impl Cleaner {
    /// Whether the cleaner carries a warning.
    #[must_use]
    pub fn has_warning(&self) -> bool {
        self.warning.is_some()
    }

    /// Look up an option by its id.
    #[must_use]
    pub fn option(&self, id: &str) -> Option<&CleanerOption> {
        self.options.iter().find(|o| o.id == id)
    }

    /// Build a one-off cleaner that shreds the given paths.
    ///
    /// Used by the `shred` subcommand so ad hoc shredding goes through the
    /// same safety filter and reporting as rule-driven cleaning.
    #[must_use]
    pub fn ad_hoc_shred(paths: &[PathBuf]) -> Self {
        let actions = paths
            .iter()
            .map(|p| Action::ShredPath {
                pattern: literal_pattern(&p.to_string_lossy()),
            })
            .collect();

        Self {
            id: "shred".to_string(),
            name: "Shred".to_string(),
            description: "Overwrite and delete the given files".to_string(),
            warning: None,
            running: Vec::new(),
            options: vec![CleanerOption {
                id: "paths".to_string(),
                label: "Selected paths".to_string(),
                description: None,
                warning: None,
                default_enabled: true,
                actions,
            }],
        }
    }
}

/// One independently selectable cleaning behavior within a cleaner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanerOption {
    /// Identifier, unique within the owning cleaner.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Longer description.
    pub description: Option<String>,
    /// Warning specific to this option.
    pub warning: Option<String>,
    /// Whether the option is selected by default.
    pub default_enabled: bool,
    /// Ordered actions.
    pub actions: Vec<Action>,
}

/// A declared operation belonging to an option.
///
/// The set of kinds is closed; documents naming other kinds have those
/// actions dropped at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Delete files or directories matching a pattern.
    DeletePath {
        pattern: String,
        #[serde(default)]
        recursive: bool,
        /// Filter applied to each candidate's file name.
        #[serde(default)]
        regex: Option<String>,
    },
    /// Overwrite file contents before unlinking.
    ShredPath { pattern: String },
    /// Delete a registry key.
    DeleteRegistryKey {
        hive: String,
        key_path: String,
        #[serde(default)]
        recursive: bool,
    },
    /// Delete a single registry value.
    DeleteRegistryValue {
        hive: String,
        key_path: String,
        value_name: String,
    },
    /// Run an external program, without a shell.
    RunCommand {
        executable: String,
        #[serde(default)]
        args: Vec<String>,
        /// Lines matching this report freed space in their first capture
        /// group (e.g. `freed (\S+)`).
        #[serde(default)]
        freed_space_regex: Option<String>,
        /// Any output line matching one of these fails the command even
        /// when it exits successfully.
        #[serde(default)]
        error_line_regexes: Vec<String>,
    },
    /// Fill the free space of the volume holding `root`, then release it.
    WipeFreeSpace { root: String },
}

impl Action {
    /// Every kind name the loader understands.
    pub const KINDS: [&'static str; 6] = [
        "delete_path",
        "shred_path",
        "delete_registry_key",
        "delete_registry_value",
        "run_command",
        "wipe_free_space",
    ];

    /// The serialized kind name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DeletePath { .. } => "delete_path",
            Self::ShredPath { .. } => "shred_path",
            Self::DeleteRegistryKey { .. } => "delete_registry_key",
            Self::DeleteRegistryValue { .. } => "delete_registry_value",
            Self::RunCommand { .. } => "run_command",
            Self::WipeFreeSpace { .. } => "wipe_free_space",
        }
    }
}

/// Global address of an option: `cleaner_id.option_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct OptionKey {
    /// Owning cleaner id.
    pub cleaner: String,
    /// Option id within the cleaner.
    pub option: String,
}

impl OptionKey {
    /// Create a key from its parts.
    #[must_use]
    pub fn new(cleaner: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            cleaner: cleaner.into(),
            option: option.into(),
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cleaner, self.option)
    }
}

impl From<OptionKey> for String {
    fn from(key: OptionKey) -> Self {
        key.to_string()
    }
}

/// Error returned when an option key string is not `cleaner.option`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid option id '{0}', expected 'cleaner.option'")]
pub struct OptionKeyParseError(pub String);

impl FromStr for OptionKey {
    type Err = OptionKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((cleaner, option)) if !cleaner.is_empty() && !option.is_empty() => {
                Ok(Self::new(cleaner, option))
            }
            _ => Err(OptionKeyParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_key_roundtrip_display() {
        let key: OptionKey = "firefox.cache".parse().unwrap();
        assert_eq!(key.cleaner, "firefox");
        assert_eq!(key.option, "cache");
        assert_eq!(key.to_string(), "firefox.cache");
    }

    #[test]
    fn test_option_key_keeps_dots_in_option() {
        let key: OptionKey = "system.rotated.logs".parse().unwrap();
        assert_eq!(key.cleaner, "system");
        assert_eq!(key.option, "rotated.logs");
    }

    #[test]
    fn test_option_key_rejects_malformed() {
        assert!("nodot".parse::<OptionKey>().is_err());
        assert!(".cache".parse::<OptionKey>().is_err());
        assert!("firefox.".parse::<OptionKey>().is_err());
    }

    #[test]
    fn test_option_key_serializes_as_string() {
        let json = serde_json::to_string(&OptionKey::new("a", "b")).unwrap();
        assert_eq!(json, "\"a.b\"");
    }

    #[test]
    fn test_action_kind_names_match_serde_tags() {
        let action = Action::DeletePath {
            pattern: "~/x".into(),
            recursive: false,
            regex: None,
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["kind"], action.kind());
        assert!(Action::KINDS.contains(&action.kind()));
    }

    #[test]
    fn test_ad_hoc_shred_escapes_glob_characters() {
        let cleaner = Cleaner::ad_hoc_shred(&[PathBuf::from("/tmp/a[1].txt")]);
        match &cleaner.options[0].actions[0] {
            Action::ShredPath { pattern } => assert_eq!(pattern, "/tmp/a[[]1[]].txt"),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_ad_hoc_shred_escapes_variable_sigils() {
        let cleaner = Cleaner::ad_hoc_shred(&[PathBuf::from("/tmp/$HOME%TEMP%")]);
        match &cleaner.options[0].actions[0] {
            Action::ShredPath { pattern } => assert_eq!(pattern, "/tmp/[$]HOME[%]TEMP[%]"),
            other => panic!("unexpected action {other:?}"),
        }
    }
}
