//! Per-target outcomes of a run.
//!
//! Every item the engine considers ends up with exactly one [`RunOutcome`].
//! Failures are data, not errors: they are recorded and the run continues.

use std::fmt;
use std::io;

use serde::Serialize;

use crate::definitions::OptionKey;
use crate::target::{TargetId, TargetKind};

/// Why a candidate was not acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The target no longer exists.
    NotFound,
    /// The target could not be read while resolving.
    PermissionDenied,
    /// A safety rule protects the target.
    Excluded(String),
    /// The candidate resolves outside the pattern's declared root.
    OutsideDeclaredRoot,
    /// The target changed kind between preview and commit.
    KindChanged,
    /// A non-recursive directory target still has contents.
    NotEmpty,
    /// The named application is running.
    ApplicationRunning(String),
    /// The pattern references a variable the host does not define.
    UnresolvedVariable(String),
    /// A command's executable could not be located.
    ExecutableNotFound(String),
    /// The declared pattern cannot be expanded.
    InvalidPattern(String),
    /// The run was cancelled before this item was attempted.
    Cancelled,
    /// The same target was already planned by another option.
    DuplicateTarget,
    /// The target type is not supported on this platform.
    Unsupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Excluded(why) => write!(f, "excluded: {why}"),
            Self::OutsideDeclaredRoot => write!(f, "outside declared root"),
            Self::KindChanged => write!(f, "changed since preview"),
            Self::NotEmpty => write!(f, "directory not empty"),
            Self::ApplicationRunning(name) => write!(f, "{name} is running"),
            Self::UnresolvedVariable(name) => write!(f, "unresolved variable {name}"),
            Self::ExecutableNotFound(name) => write!(f, "executable not found: {name}"),
            Self::InvalidPattern(why) => write!(f, "invalid pattern: {why}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::DuplicateTarget => write!(f, "duplicate target"),
            Self::Unsupported => write!(f, "unsupported on this platform"),
        }
    }
}

/// Category of a commit-time failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The operating system refused the operation.
    Permission,
    /// Overwriting failed; the file was left in place.
    IoDuringShred,
    /// An external command failed to launch, timed out or exited non-zero.
    ExternalCommand,
    /// Any other I/O error.
    Io,
    /// A registry operation failed.
    Registry,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Permission => "permission",
            Self::IoDuringShred => "io_during_shred",
            Self::ExternalCommand => "external_command",
            Self::Io => "io",
            Self::Registry => "registry",
        };
        f.write_str(name)
    }
}

/// Result of attempting one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Removed (or wiped); carries the bytes freed or written.
    Deleted(u64),
    /// Not attempted.
    Skipped(SkipReason),
    /// Attempted and failed.
    Failed(FailureKind, String),
}

impl RunOutcome {
    /// Map an I/O error from a commit-time operation.
    ///
    /// `NotFound` means something else removed the target first and is not a
    /// failure.
    #[must_use]
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::Skipped(SkipReason::NotFound),
            io::ErrorKind::PermissionDenied => {
                Self::Failed(FailureKind::Permission, err.to_string())
            }
            io::ErrorKind::DirectoryNotEmpty => Self::Skipped(SkipReason::NotEmpty),
            io::ErrorKind::Unsupported => Self::Skipped(SkipReason::Unsupported),
            _ => Self::Failed(FailureKind::Io, err.to_string()),
        }
    }

    /// Bytes freed, zero unless deleted.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Deleted(bytes) => *bytes,
            _ => 0,
        }
    }

    /// Whether this is a `Deleted` outcome.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }

    /// Whether this is a `Skipped` outcome.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Whether this is a `Failed` outcome.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(..))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted(bytes) => write!(f, "deleted ({bytes} bytes)"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(kind, message) => write!(f, "failed [{kind}]: {message}"),
        }
    }
}

/// Outcome attached to the target it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeRecord {
    /// Option that produced the target.
    pub option: OptionKey,
    /// The target.
    pub target: TargetId,
    /// Kind of the target as previewed.
    pub kind: TargetKind,
    /// What happened.
    pub outcome: RunOutcome,
}

/// A candidate rejected while resolving, before any target existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    /// Option whose action was being resolved.
    pub option: OptionKey,
    /// Path, key, pattern or command the record is about.
    pub subject: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

impl SkipRecord {
    /// Create a skip record.
    #[must_use]
    pub fn new(option: OptionKey, subject: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            option,
            subject: subject.into(),
            reason,
        }
    }
}
