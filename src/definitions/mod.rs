//! Cleaner definitions: the rule model and the document loader.
//!
//! # Example
//!
//! ```no_run
//! use cleanbit::definitions::load_dirs;
//! use std::path::PathBuf;
//!
//! let report = load_dirs(&[PathBuf::from("/usr/share/cleanbit/cleaners")]);
//! for cleaner in &report.cleaners {
//!     println!("{} ({} options)", cleaner.name, cleaner.options.len());
//! }
//! for err in &report.rejected {
//!     eprintln!("{err}");
//! }
//! ```

pub mod loader;
pub mod model;

pub use loader::{
    load_dirs, load_file, parse_cleaner, DefinitionError, DocumentFormat, LoadReport,
    ParsedCleaner,
};
pub use model::{Action, Cleaner, CleanerOption, OptionKey, OptionKeyParseError};
