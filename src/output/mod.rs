//! Output formatters for listings, previews and run reports.
//!
//! - text for terminals (colored with `yansi`, sizes with `bytesize`)
//! - JSON for automation and scripting
//! - CSV for spreadsheet import, one row per target
//!
//! # Example
//!
//! ```no_run
//! use cleanbit::definitions::load_dirs;
//! use cleanbit::engine::{Engine, EngineConfig};
//! use cleanbit::matcher::HostEnvironment;
//! use cleanbit::output::json::JsonPreview;
//! use std::path::PathBuf;
//!
//! let loaded = load_dirs(&[PathBuf::from("cleaners")]);
//! let engine = Engine::new(loaded.cleaners, EngineConfig::new(HostEnvironment::from_process()))?;
//! let preview = engine.preview(&engine.default_selection())?;
//!
//! println!("{}", JsonPreview::new(&preview).to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::io::Write;

use thiserror::Error;

use crate::cli::OutputFormat;
use crate::definitions::Cleaner;
use crate::engine::{Preview, RunReport};
use crate::error::ExitCode;

pub use self::csv::CsvOutput;
pub use self::json::{JsonCleaners, JsonPreview, JsonReport};
pub use self::text::TextOutput;

/// Errors writing formatted output.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error during JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Write the cleaner listing in `format`.
///
/// # Errors
///
/// Returns [`OutputError`] if writing or serialization fails.
pub fn write_cleaners<W: Write>(
    writer: W,
    format: OutputFormat,
    cleaners: &[Cleaner],
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(writer).cleaners(cleaners),
        OutputFormat::Json => JsonCleaners::new(cleaners).write_to(writer),
        OutputFormat::Csv => CsvOutput::new(writer).cleaners(cleaners),
    }
}

/// Write a preview in `format`.
///
/// # Errors
///
/// Returns [`OutputError`] if writing or serialization fails.
pub fn write_preview<W: Write>(
    writer: W,
    format: OutputFormat,
    preview: &Preview,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(writer).preview(preview),
        OutputFormat::Json => JsonPreview::new(preview).write_to(writer),
        OutputFormat::Csv => CsvOutput::new(writer).preview(preview),
    }
}

/// Write a run report in `format`.
///
/// # Errors
///
/// Returns [`OutputError`] if writing or serialization fails.
pub fn write_report<W: Write>(
    writer: W,
    format: OutputFormat,
    report: &RunReport,
    exit_code: ExitCode,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(writer).report(report),
        OutputFormat::Json => JsonReport::new(report, exit_code).write_to(writer),
        OutputFormat::Csv => CsvOutput::new(writer).report(report),
    }
}
