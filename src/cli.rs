//! Command-line interface definitions for cleanbit.
//!
//! Defined with the clap derive API: global options (verbosity, color,
//! configuration overrides) plus one subcommand per operation.
//!
//! # Example
//!
//! ```bash
//! # List every loaded cleaner and its options
//! cleanbit list
//!
//! # Show what the default options would remove
//! cleanbit preview --defaults
//!
//! # Clean two options, shredding files instead of unlinking them
//! cleanbit clean firefox.cache 'thumbnails.*' --shred --yes
//!
//! # Machine-readable report
//! cleanbit --output json clean system.tmp --yes
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::MAX_SHRED_PASSES;

/// Rule-driven disk and privacy cleaner.
///
/// Cleaners are loaded from definition documents. Every clean is previewed
/// first and re-checked target by target before anything is removed.
#[derive(Debug, Parser)]
#[command(name = "cleanbit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Load cleaner definitions from DIR instead of the configured directories
    ///
    /// Can be specified multiple times.
    #[arg(long = "cleaners", global = true, value_name = "DIR")]
    pub cleaner_dirs: Vec<PathBuf>,

    /// Never touch paths matching PATTERN (file, folder or glob)
    ///
    /// Added to the exclusions from the configuration file.
    #[arg(long = "exclude", global = true, value_name = "PATTERN")]
    pub exclusions: Vec<String>,

    /// Output format for listings, previews and reports
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List loaded cleaners and their options
    List,
    /// Show what cleaning the selected options would remove
    Preview(SelectArgs),
    /// Remove what the selected options match
    Clean(CleanArgs),
    /// Overwrite and delete the given files
    Shred(ShredArgs),
}

/// Option selection shared by `preview` and `clean`.
#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Options to run, as `cleaner.option` or `cleaner.*`
    #[arg(value_name = "OPTION", required_unless_present = "defaults")]
    pub options: Vec<String>,

    /// Select every option enabled by default
    #[arg(long)]
    pub defaults: bool,
}

/// Arguments for the clean subcommand.
#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Confirm deletion (without it, only the preview is shown)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Overwrite files before deleting them
    #[arg(long)]
    pub shred: bool,

    /// Stop free space wiping after SIZE bytes (e.g. 500MB, 2GiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub wipe_limit: Option<u64>,
}

/// Arguments for the shred subcommand.
#[derive(Debug, Args)]
pub struct ShredArgs {
    /// Files or directories to shred
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Confirm shredding (without it, only the preview is shown)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Overwrite passes per file
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=MAX_SHRED_PASSES as i64))]
    pub passes: Option<u32>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use cleanbit::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
