//! Application configuration management.
//!
//! Configuration is layered with figment, later layers overriding earlier
//! ones:
//!
//! 1. built-in defaults
//! 2. `config.toml` in the platform config directory (or `--config`)
//! 3. `CLEANBIT_*` environment variables (`__` separates nested keys)
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on overwrite passes.
pub const MAX_SHRED_PASSES: u32 = 35;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("invalid value for '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched for cleaner definitions, in order.
    pub cleaner_dirs: Vec<PathBuf>,
    /// User exclusions: files, folders (whole subtree) or glob patterns.
    pub exclusions: Vec<String>,
    /// Overwrite files before deleting them.
    pub shred: bool,
    /// Overwrite passes per shredded file.
    pub shred_passes: u32,
    /// Upper bound in bytes for free space wiping; unset means until full.
    pub wipe_limit: Option<u64>,
    /// Refuse to delete files held open by running processes.
    pub protect_open_files: bool,
    /// Skip cleaners whose application is running.
    pub skip_running_apps: bool,
    /// Time limit for external commands; zero disables it.
    pub command_timeout_secs: u64,
    /// Preview worker threads; zero uses one per CPU.
    pub preview_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cleaner_dirs: default_cleaner_dirs(),
            exclusions: Vec::new(),
            shred: false,
            shred_passes: 1,
            wipe_limit: None,
            protect_open_files: true,
            skip_running_apps: true,
            command_timeout_secs: 300,
            preview_threads: 0,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `path` replaces the default config file location; unlike the default
    /// file, it must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer is malformed or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::config_path() {
                    log::debug!("Looking for config at {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Self::from_figment(figment.merge(Env::prefixed("CLEANBIT_").split("__")))
    }

    /// Extract and validate a configuration from `figment`.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shred_passes == 0 || self.shred_passes > MAX_SHRED_PASSES {
            return Err(ConfigError::Invalid {
                field: "shred_passes",
                message: format!("must be between 1 and {MAX_SHRED_PASSES}"),
            });
        }
        if self.wipe_limit == Some(0) {
            return Err(ConfigError::Invalid {
                field: "wipe_limit",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.preview_threads > 256 {
            return Err(ConfigError::Invalid {
                field: "preview_threads",
                message: "must be at most 256".to_string(),
            });
        }
        Ok(())
    }

    /// The default platform-specific configuration file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "cleanbit", "cleanbit")
}

/// System-wide cleaners first, then the user's own.
#[must_use]
pub fn default_cleaner_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(unix) {
        dirs.push(PathBuf::from("/usr/share/cleanbit/cleaners"));
    }
    if let Some(project) = project_dirs() {
        dirs.push(project.config_dir().join("cleaners"));
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.shred_passes, 1);
        assert!(config.wipe_limit.is_none());
        assert!(config.protect_open_files);
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "shred = true\nshred_passes = 3\nwipe_limit = 1048576\nexclusions = [\"~/keep\"]\n",
        )
        .unwrap();

        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&path));
        let config = Config::from_figment(figment).unwrap();

        assert!(config.shred);
        assert_eq!(config.shred_passes, 3);
        assert_eq!(config.wipe_limit, Some(1_048_576));
        assert_eq!(config.exclusions, vec!["~/keep".to_string()]);
        assert!(config.skip_running_apps);
    }

    #[test]
    fn test_invalid_passes_rejected() {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("shred_passes", 0));
        assert!(matches!(
            Config::from_figment(figment),
            Err(ConfigError::Invalid {
                field: "shred_passes",
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_type_is_figment_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "shred_passes = \"many\"\n").unwrap();

        let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&path));
        assert!(matches!(
            Config::from_figment(figment),
            Err(ConfigError::Figment(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_default_cleaner_dirs_end_with_user_dir() {
        let dirs = default_cleaner_dirs();
        if let Some(last) = dirs.last() {
            assert!(last.ends_with("cleaners"));
        }
    }
}
