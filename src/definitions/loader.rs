//! Rule document loading.
//!
//! Documents are TOML (or JSON with the same shape), one cleaner per file.
//! Loading is forgiving at every level it can be:
//!
//! - a document that cannot be parsed, or has no usable cleaner id, is rejected
//!   on its own and loading continues with the next file;
//! - a malformed option is rejected and reported, its siblings survive;
//! - an action with an unknown `kind` is dropped with a warning, so newer rule
//!   vocabularies still load on older engines;
//! - unknown fields are ignored everywhere.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

use super::model::{Action, Cleaner, CleanerOption};
use crate::matcher::registry::Hive;

/// Errors produced while loading rule documents.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The document could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not valid TOML/JSON or has the wrong shape.
    #[error("{path}: {message}")]
    Syntax { path: PathBuf, message: String },

    /// The document has no usable cleaner id.
    #[error("{path}: {message}")]
    InvalidCleaner { path: PathBuf, message: String },

    /// Another document already defined this cleaner id.
    #[error("{path}: duplicate cleaner id '{id}'")]
    DuplicateCleaner { path: PathBuf, id: String },

    /// One option of an otherwise valid document was rejected.
    #[error("{path}: option '{option}' rejected: {message}")]
    InvalidOption {
        path: PathBuf,
        option: String,
        message: String,
    },
}

impl DefinitionError {
    /// The document this error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Syntax { path, .. }
            | Self::InvalidCleaner { path, .. }
            | Self::DuplicateCleaner { path, .. }
            | Self::InvalidOption { path, .. } => path,
        }
    }
}

/// Serialization format of a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// TOML document (`.toml`).
    Toml,
    /// JSON document (`.json`).
    Json,
}

impl DocumentFormat {
    /// Determine the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A cleaner parsed from one document, with any options that were rejected.
#[derive(Debug)]
pub struct ParsedCleaner {
    /// The usable cleaner.
    pub cleaner: Cleaner,
    /// Options that were dropped from it.
    pub rejected_options: Vec<DefinitionError>,
}

/// Result of loading a set of directories.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully parsed cleaners, in load order.
    pub cleaners: Vec<Cleaner>,
    /// Rejected documents and options, with reasons.
    pub rejected: Vec<DefinitionError>,
}

impl LoadReport {
    /// Whether anything was rejected.
    #[must_use]
    pub fn has_rejections(&self) -> bool {
        !self.rejected.is_empty()
    }

    /// Total number of usable options across all cleaners.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.cleaners.iter().map(|c| c.options.len()).sum()
    }

    fn absorb(&mut self, parsed: ParsedCleaner, path: &Path, seen: &mut HashSet<String>) {
        if !seen.insert(parsed.cleaner.id.clone()) {
            log::warn!(
                "Rejecting {}: cleaner '{}' already loaded",
                path.display(),
                parsed.cleaner.id
            );
            self.rejected.push(DefinitionError::DuplicateCleaner {
                path: path.to_path_buf(),
                id: parsed.cleaner.id,
            });
            return;
        }
        for err in &parsed.rejected_options {
            log::warn!("{err}");
        }
        self.rejected.extend(parsed.rejected_options);
        self.cleaners.push(parsed.cleaner);
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    description: String,
    warning: Option<String>,
    #[serde(default)]
    running: Vec<String>,
    #[serde(default, alias = "options")]
    option: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    id: String,
    label: Option<String>,
    description: Option<String>,
    warning: Option<String>,
    #[serde(default, alias = "default_enabled")]
    default: bool,
    #[serde(default, alias = "actions")]
    action: Vec<Value>,
}

/// Parse one document from memory.
///
/// `origin` is only used to label errors.
///
/// # Errors
///
/// Returns an error if the document as a whole is unusable. Option-level
/// problems are returned inside [`ParsedCleaner::rejected_options`].
pub fn parse_cleaner(
    source: &str,
    format: DocumentFormat,
    origin: &Path,
) -> Result<ParsedCleaner, DefinitionError> {
    let raw: RawDocument = match format {
        DocumentFormat::Toml => toml::from_str(source).map_err(|e| DefinitionError::Syntax {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })?,
        DocumentFormat::Json => {
            serde_json::from_str(source).map_err(|e| DefinitionError::Syntax {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?
        }
    };

    let id = raw.id.unwrap_or_default().trim().to_string();
    if let Err(message) = validate_identifier(&id) {
        return Err(DefinitionError::InvalidCleaner {
            path: origin.to_path_buf(),
            message: format!("cleaner {message}"),
        });
    }

    let mut options: Vec<CleanerOption> = Vec::new();
    let mut rejected_options = Vec::new();

    for (index, value) in raw.option.into_iter().enumerate() {
        match parse_option(value, &id) {
            Ok(option) if options.iter().any(|o| o.id == option.id) => {
                rejected_options.push(DefinitionError::InvalidOption {
                    path: origin.to_path_buf(),
                    option: option.id,
                    message: "duplicate option id".to_string(),
                });
            }
            Ok(option) => options.push(option),
            Err((option, message)) => {
                rejected_options.push(DefinitionError::InvalidOption {
                    path: origin.to_path_buf(),
                    option: option.unwrap_or_else(|| format!("#{}", index + 1)),
                    message,
                });
            }
        }
    }

    if options.is_empty() {
        log::debug!("Cleaner '{}' has no usable options", id);
    }

    Ok(ParsedCleaner {
        cleaner: Cleaner {
            name: raw.name.unwrap_or_else(|| id.clone()),
            id,
            description: raw.description,
            warning: raw.warning,
            running: raw.running,
            options,
        },
        rejected_options,
    })
}

fn validate_identifier(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("id is missing or empty".to_string());
    }
    if id.contains('.') || id.chars().any(char::is_whitespace) {
        return Err(format!("id '{id}' may not contain dots or whitespace"));
    }
    Ok(())
}

fn parse_option(value: Value, cleaner_id: &str) -> Result<CleanerOption, (Option<String>, String)> {
    let hint = value
        .get("id")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let raw: RawOption = serde_json::from_value(value).map_err(|e| (hint.clone(), e.to_string()))?;
    let id = raw.id.trim().to_string();
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err((Some(id), "option id is empty or contains whitespace".to_string()));
    }

    let mut actions = Vec::with_capacity(raw.action.len());
    for (index, value) in raw.action.into_iter().enumerate() {
        match parse_action(value) {
            Ok(Some(action)) => actions.push(action),
            Ok(None) => {}
            Err(message) => {
                return Err((Some(id), format!("action #{}: {message}", index + 1)));
            }
        }
    }
    log::trace!("Loaded option {}.{} with {} action(s)", cleaner_id, id, actions.len());

    Ok(CleanerOption {
        label: raw.label.unwrap_or_else(|| id.clone()),
        id,
        description: raw.description,
        warning: raw.warning,
        default_enabled: raw.default,
        actions,
    })
}

/// Parse a single action, returning `Ok(None)` for unknown kinds.
fn parse_action(value: Value) -> Result<Option<Action>, String> {
    let Some(kind) = value.get("kind").and_then(Value::as_str) else {
        return Err("missing 'kind'".to_string());
    };

    if !Action::KINDS.contains(&kind) {
        log::warn!("Dropping action with unknown kind '{}'", kind);
        return Ok(None);
    }

    let action: Action = serde_json::from_value(value).map_err(|e| e.to_string())?;
    validate_action(&action)?;
    Ok(Some(action))
}

fn validate_action(action: &Action) -> Result<(), String> {
    match action {
        Action::DeletePath { pattern, regex, .. } => {
            validate_pattern(pattern)?;
            if let Some(re) = regex {
                regex::Regex::new(re).map_err(|e| format!("invalid regex: {e}"))?;
            }
        }
        Action::ShredPath { pattern } => validate_pattern(pattern)?,
        Action::DeleteRegistryKey { hive, key_path, .. } => {
            Hive::from_str(hive)?;
            if key_path.trim().is_empty() {
                return Err("empty registry key path".to_string());
            }
        }
        Action::DeleteRegistryValue {
            hive,
            key_path,
            value_name,
        } => {
            Hive::from_str(hive)?;
            if key_path.trim().is_empty() || value_name.is_empty() {
                return Err("empty registry key path or value name".to_string());
            }
        }
        Action::RunCommand {
            executable,
            freed_space_regex,
            error_line_regexes,
            ..
        } => {
            if executable.trim().is_empty() {
                return Err("empty executable".to_string());
            }
            for re in freed_space_regex.iter().chain(error_line_regexes) {
                regex::Regex::new(re).map_err(|e| format!("invalid regex: {e}"))?;
            }
        }
        Action::WipeFreeSpace { root } => {
            if root.trim().is_empty() {
                return Err("empty root".to_string());
            }
        }
    }
    Ok(())
}

fn validate_pattern(pattern: &str) -> Result<(), String> {
    if pattern.trim().is_empty() {
        return Err("empty pattern".to_string());
    }
    glob::Pattern::new(pattern).map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
    Ok(())
}

/// Load one document from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unknown extension,
/// or is rejected by [`parse_cleaner`].
pub fn load_file(path: &Path) -> Result<ParsedCleaner, DefinitionError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| DefinitionError::Syntax {
        path: path.to_path_buf(),
        message: "unsupported document extension".to_string(),
    })?;
    let source = fs::read_to_string(path).map_err(|source| DefinitionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_cleaner(&source, format, path)
}

/// Load every rule document in the given directories.
///
/// Files are read in file-name order within each directory, and directories
/// in the order given. Missing directories are skipped. Files that are not
/// `.toml` or `.json` are ignored.
#[must_use]
pub fn load_dirs(dirs: &[PathBuf]) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();

    for dir in dirs {
        if !dir.is_dir() {
            log::debug!("Cleaner directory not present: {}", dir.display());
            continue;
        }

        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter();

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e.path().map_or_else(|| dir.clone(), Path::to_path_buf);
                    log::warn!("Cannot read cleaner directory entry {}: {}", path.display(), e);
                    report.rejected.push(DefinitionError::Io {
                        path,
                        source: e
                            .into_io_error()
                            .unwrap_or_else(|| io::Error::other("directory walk failed")),
                    });
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || DocumentFormat::from_path(path).is_none() {
                continue;
            }

            match load_file(path) {
                Ok(parsed) => report.absorb(parsed, path, &mut seen),
                Err(err) => {
                    log::warn!("Rejecting rule document: {err}");
                    report.rejected.push(err);
                }
            }
        }
    }

    log::info!(
        "Loaded {} cleaner(s) with {} option(s), {} rejection(s)",
        report.cleaners.len(),
        report.option_count(),
        report.rejected.len()
    );
    report
}
