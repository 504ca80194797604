//! Logging infrastructure for cleanbit.
//!
//! Structured logging uses the `log` facade and the `env_logger` backend.
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (errors only) or `-v` repeated
//! 3. Default: warnings only, so per-target lines stay out of reports
//!
//! What is logged where:
//!
//! - `info`: every removal, shred, wipe and command run
//! - `debug`: skips and their reasons
//! - `warn`: failures and dropped definition actions
//!
//! # Build-specific Formatting
//!
//! Debug builds prefix each line with a timestamp. With `-vv` every line
//! also names the module that emitted it.
//!
//! # Example
//!
//! ```rust,no_run
//! use cleanbit::logging::init_logging;
//!
//! // -v: show every deleted target
//! init_logging(1, false);
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// Call once at startup. A second call leaves the first logger in place.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=warn, 1=info, 2=debug, 3+=trace)
/// * `quiet` - If true, only show errors (overridden by `RUST_LOG`)
pub fn init_logging(verbose: u8, quiet: bool) {
    let level = determine_level(verbose, quiet);
    let env = Env::default().default_filter_or(level.as_str().to_ascii_lowercase());

    let mut builder = Builder::from_env(env);
    configure_format(&mut builder, verbose >= 2);

    if builder.try_init().is_ok() {
        log::debug!("Logging initialized, max level {}", log::max_level());
    }
}

/// Map CLI flags to a level filter.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Debug builds prefix a timestamp; release builds keep lines short.
fn configure_format(builder: &mut Builder, with_module: bool) {
    let timestamps = cfg!(debug_assertions);
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        if timestamps {
            let timestamp = buf.timestamp_seconds();
            write!(buf, "{timestamp} ")?;
        }
        write!(buf, "{style}{:<5}{style:#} ", record.level())?;
        if with_module {
            let module = record.module_path().unwrap_or_default();
            write!(buf, "[{}] ", module.strip_prefix("cleanbit::").unwrap_or(module))?;
        }
        writeln!(buf, "{}", record.args())
    });
}

/// The current maximum log level as a lowercase name.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
