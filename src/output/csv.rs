//! CSV output for spreadsheets and data analysis.
//!
//! One row per option (listing), per target (preview) or per outcome
//! (report). Skipped candidates from resolution are included as rows with
//! an empty kind.
//!
//! # Report Columns
//!
//! - `option`: `cleaner.option` that produced the row
//! - `target`: path, registry entry, command line or volume
//! - `kind`: target kind (`file`, `directory`, ...)
//! - `status`: `deleted`, `skipped` or `failed`
//! - `bytes`: bytes freed or written
//! - `detail`: skip reason or failure message

use std::io::Write;

use serde::Serialize;

use super::text::disposition_label;
use super::OutputError;
use crate::definitions::{Cleaner, OptionKey};
use crate::engine::{Preview, RunReport};
use crate::outcome::{RunOutcome, SkipRecord};

#[derive(Debug, Serialize)]
struct OptionRow<'a> {
    option: String,
    label: &'a str,
    default: bool,
    actions: String,
    warning: &'a str,
}

#[derive(Debug, Serialize)]
struct PreviewRow {
    option: String,
    target: String,
    kind: String,
    action: &'static str,
    bytes: u64,
}

#[derive(Debug, Serialize)]
struct ReportRow {
    option: String,
    target: String,
    kind: String,
    status: &'static str,
    bytes: u64,
    detail: String,
}

impl ReportRow {
    fn skip(record: &SkipRecord) -> Self {
        Self {
            option: record.option.to_string(),
            target: record.subject.clone(),
            kind: String::new(),
            status: "skipped",
            bytes: 0,
            detail: record.reason.to_string(),
        }
    }
}

/// CSV formatter writing to any [`Write`].
pub struct CsvOutput<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvOutput<W> {
    /// Create a formatter over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// One row per option.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn cleaners(mut self, cleaners: &[Cleaner]) -> Result<(), OutputError> {
        for cleaner in cleaners {
            for option in &cleaner.options {
                let actions: Vec<&str> = option.actions.iter().map(|a| a.kind()).collect();
                self.writer.serialize(OptionRow {
                    option: OptionKey::new(&cleaner.id, &option.id).to_string(),
                    label: &option.label,
                    default: option.default_enabled,
                    actions: actions.join(" "),
                    warning: option
                        .warning
                        .as_deref()
                        .or(cleaner.warning.as_deref())
                        .unwrap_or(""),
                })?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// One row per previewed target.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn preview(mut self, preview: &Preview) -> Result<(), OutputError> {
        for result in &preview.results {
            self.writer.serialize(PreviewRow {
                option: result.option.to_string(),
                target: result.target.to_string(),
                kind: result.kind.to_string(),
                action: disposition_label(result.disposition),
                bytes: result.bytes,
            })?;
        }
        for skip in &preview.skipped {
            self.writer.serialize(PreviewRow {
                option: skip.option.to_string(),
                target: skip.subject.clone(),
                kind: String::new(),
                action: "skip",
                bytes: 0,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// One row per outcome, then one per resolution skip.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if writing or serialization fails.
    pub fn report(mut self, report: &RunReport) -> Result<(), OutputError> {
        for record in &report.outcomes {
            let (status, detail) = match &record.outcome {
                RunOutcome::Deleted(_) => ("deleted", String::new()),
                RunOutcome::Skipped(reason) => ("skipped", reason.to_string()),
                RunOutcome::Failed(kind, message) => ("failed", format!("{kind}: {message}")),
            };
            self.writer.serialize(ReportRow {
                option: record.option.to_string(),
                target: record.target.to_string(),
                kind: record.kind.to_string(),
                status,
                bytes: record.outcome.bytes(),
                detail,
            })?;
        }
        for skip in &report.skipped {
            self.writer.serialize(ReportRow::skip(skip))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
