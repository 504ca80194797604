//! JSON output for scripting and automation.
//!
//! # Report Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "started_at": "2026-01-01T10:00:00Z",
//!     "finished_at": "2026-01-01T10:00:02Z",
//!     "state": "done",
//!     "cancelled": false,
//!     "deleted": 3,
//!     "skipped": 0,
//!     "failed": 0,
//!     "bytes_freed": 4096,
//!     "bytes_wiped": 0,
//!     "exit_code": 0,
//!     "exit_code_name": "CB000"
//!   },
//!   "per_option": { "browser.cache": { "targets": 3, "bytes": 4096, "skipped": 0, "failed": 0 } },
//!   "outcomes": [
//!     {
//!       "option": "browser.cache",
//!       "target": { "type": "path", "path": "/home/u/cache/a.tmp" },
//!       "kind": "file",
//!       "outcome": { "status": "deleted", "detail": 1024 }
//!     }
//!   ],
//!   "skipped": []
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::OutputError;
use crate::definitions::{Cleaner, OptionKey};
use crate::engine::{EngineState, OptionTotals, Preview, RunReport};
use crate::error::ExitCode;
use crate::outcome::{OutcomeRecord, SkipRecord};
use crate::target::MatchResult;

fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// One option in the cleaner listing.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOption {
    /// `cleaner.option`
    pub key: String,
    /// Display label
    pub label: String,
    /// Longer description
    pub description: Option<String>,
    /// Option-specific warning
    pub warning: Option<String>,
    /// Selected by `--defaults`
    pub default: bool,
    /// Action kinds, in order
    pub actions: Vec<&'static str>,
}

/// One cleaner in the listing.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCleaner {
    /// Cleaner id
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    pub description: String,
    /// Cleaner-wide warning
    pub warning: Option<String>,
    /// Executables that block the cleaner while running
    pub running: Vec<String>,
    /// Options
    pub options: Vec<JsonOption>,
}

/// Listing of loaded cleaners.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCleaners {
    /// Cleaners in load order
    pub cleaners: Vec<JsonCleaner>,
}

impl JsonCleaners {
    /// Build the listing.
    #[must_use]
    pub fn new(cleaners: &[Cleaner]) -> Self {
        let cleaners = cleaners
            .iter()
            .map(|c| JsonCleaner {
                id: c.id.clone(),
                name: c.name.clone(),
                description: c.description.clone(),
                warning: c.warning.clone(),
                running: c.running.clone(),
                options: c
                    .options
                    .iter()
                    .map(|o| JsonOption {
                        key: OptionKey::new(&c.id, &o.id).to_string(),
                        label: o.label.clone(),
                        description: o.description.clone(),
                        warning: o.warning.clone(),
                        default: o.default_enabled,
                        actions: o.actions.iter().map(|a| a.kind()).collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { cleaners }
    }

    /// Write pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), OutputError> {
        write_json(writer, self)
    }
}

/// Preview totals.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPreviewSummary {
    /// When the preview was produced
    pub generated_at: DateTime<Utc>,
    /// Number of targets, duplicates included
    pub targets: usize,
    /// Number of skipped candidates
    pub skipped: usize,
    /// Bytes commit is expected to free
    pub estimated_bytes: u64,
    /// Bytes free space wipes would write
    pub free_space_bytes: u64,
}

/// A preview in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPreview<'a> {
    /// Totals
    pub summary: JsonPreviewSummary,
    /// Totals per option
    pub per_option: BTreeMap<OptionKey, OptionTotals>,
    /// Targets commit would act on
    pub results: &'a [MatchResult],
    /// Candidates that will be left alone
    pub skipped: &'a [SkipRecord],
}

impl<'a> JsonPreview<'a> {
    /// Wrap a preview.
    #[must_use]
    pub fn new(preview: &'a Preview) -> Self {
        Self {
            summary: JsonPreviewSummary {
                generated_at: preview.generated_at,
                targets: preview.results.len(),
                skipped: preview.skipped.len(),
                estimated_bytes: preview.estimated_bytes,
                free_space_bytes: preview.free_space_bytes,
            },
            per_option: preview.per_option(),
            results: &preview.results,
            skipped: &preview.skipped,
        }
    }

    /// Compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), OutputError> {
        write_json(writer, self)
    }
}

/// Run totals.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReportSummary {
    /// When commit started
    pub started_at: DateTime<Utc>,
    /// When commit finished
    pub finished_at: DateTime<Utc>,
    /// Final engine state
    pub state: EngineState,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Items removed, shredded, wiped or run
    pub deleted: usize,
    /// Items and candidates skipped
    pub skipped: usize,
    /// Items that failed
    pub failed: usize,
    /// Bytes freed
    pub bytes_freed: u64,
    /// Bytes written by free space wipes
    pub bytes_wiped: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "CB002")
    pub exit_code_name: String,
}

/// A run report in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    /// Totals
    pub summary: JsonReportSummary,
    /// Totals per option
    pub per_option: BTreeMap<OptionKey, OptionTotals>,
    /// One record per item
    pub outcomes: &'a [OutcomeRecord],
    /// Candidates rejected while resolving
    pub skipped: &'a [SkipRecord],
}

impl<'a> JsonReport<'a> {
    /// Wrap a report together with the exit code it produces.
    #[must_use]
    pub fn new(report: &'a RunReport, exit_code: ExitCode) -> Self {
        Self {
            summary: JsonReportSummary {
                started_at: report.started_at,
                finished_at: report.finished_at,
                state: report.state,
                cancelled: report.cancelled,
                deleted: report.deleted_count(),
                skipped: report.skipped_count(),
                failed: report.failed_count(),
                bytes_freed: report.bytes_freed(),
                bytes_wiped: report.bytes_wiped(),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
            per_option: report.per_option(),
            outcomes: &report.outcomes,
            skipped: &report.skipped,
        }
    }

    /// Pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), OutputError> {
        write_json(writer, self)
    }
}
