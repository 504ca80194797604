//! Path and registry matching.
//!
//! This module turns declared patterns into existing targets:
//!
//! - [`env`]: `~` and variable expansion from an explicit [`HostEnvironment`]
//! - [`pattern`]: glob expansion, recursive descent, declared-root checks
//! - [`registry`]: key and value lookup (Windows only)

pub mod env;
pub mod pattern;
pub mod registry;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::SkipReason;
use crate::target::TargetId;

pub use env::{literal_pattern, HostEnvironment};
pub use pattern::{declared_root, Candidate, Expansion, PathPattern};
pub use registry::Hive;

/// Errors that stop expansion of a single pattern.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The pattern references a variable the host does not define.
    #[error("unresolved variable '{0}'")]
    UnresolvedVariable(String),

    /// The expanded pattern is not a usable absolute glob.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The name filter does not compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// The declared root could not be resolved.
    #[error("cannot resolve {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cancellation was requested.
    #[error("expansion cancelled")]
    Cancelled,
}

impl MatchError {
    /// Skip reason recorded when a pattern cannot be expanded.
    ///
    /// Returns `None` for cancellation, which is not a per-pattern outcome.
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::UnresolvedVariable(name) => Some(SkipReason::UnresolvedVariable(name.clone())),
            Self::InvalidPattern { message, .. } => Some(SkipReason::InvalidPattern(message.clone())),
            Self::InvalidRegex(e) => Some(SkipReason::InvalidPattern(e.to_string())),
            Self::Io { source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
                Some(SkipReason::PermissionDenied)
            }
            Self::Io { .. } => Some(SkipReason::NotFound),
            Self::Cancelled => None,
        }
    }
}

/// Resolve a registry key to zero or one target.
///
/// # Errors
///
/// Returns the backend error for failures other than absence.
pub fn resolve_registry_key(hive: Hive, key_path: &str) -> io::Result<Option<TargetId>> {
    Ok(registry::key_exists(hive, key_path)?.then(|| TargetId::RegistryKey {
        hive,
        key_path: key_path.to_string(),
    }))
}

/// Resolve a registry value to zero or one target.
///
/// # Errors
///
/// Returns the backend error for failures other than absence.
pub fn resolve_registry_value(
    hive: Hive,
    key_path: &str,
    value_name: &str,
) -> io::Result<Option<TargetId>> {
    Ok(
        registry::value_exists(hive, key_path, value_name)?.then(|| TargetId::RegistryValue {
            hive,
            key_path: key_path.to_string(),
            value_name: value_name.to_string(),
        }),
    )
}
