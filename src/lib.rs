//! cleanbit - rule-driven disk and privacy cleaner.
//!
//! Cleaner definitions declare what to remove; the [`engine::Engine`]
//! previews exactly what a selection would touch, then commits it with every
//! target re-checked against the safety filter first. Files can be shredded
//! instead of unlinked, free space can be wiped, and every run produces a
//! complete per-target report.

pub mod actions;
pub mod cli;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod outcome;
pub mod output;
pub mod progress;
pub mod safety;
pub mod signal;
pub mod target;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};

use crate::cli::{Cli, Commands, OutputFormat, SelectArgs};
use crate::config::Config;
use crate::definitions::{load_dirs, Action, Cleaner, LoadReport};
use crate::engine::{Engine, EngineConfig, Selection};
use crate::error::ExitCode;
use crate::matcher::{literal_pattern, HostEnvironment};
use crate::progress::Progress;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for problems that stop the whole command: bad
/// configuration, no loadable cleaners, an invalid selection, or a failure
/// writing output. Per-target problems are reported and reflected in the
/// returned exit code instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    log::debug!(
        "cleanbit {} starting, log level {}",
        env!("CARGO_PKG_VERSION"),
        logging::current_level_name()
    );
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    apply_cli_overrides(&mut config, &cli);
    config.validate().context("checking configuration")?;

    let env = HostEnvironment::from_process();
    let engine_config =
        EngineConfig::from_config(&config, env).context("building exclusion rules")?;

    let (cleaners, load_rejections) = match &cli.command {
        Commands::Shred(args) => (vec![shred_cleaner(&args.paths)?], false),
        _ => {
            let loaded = load_dirs(&config.cleaner_dirs);
            report_rejections(&loaded);
            let rejected = loaded.has_rejections();
            (loaded.cleaners, rejected)
        }
    };

    let cancel = signal::install_handler()?;
    let show_progress = !cli.quiet && cli.output == OutputFormat::Text;
    let engine = Engine::new(cleaners, engine_config)
        .context("starting engine")?
        .with_cancel_token(cancel)
        .with_progress(Arc::new(Progress::new(!show_progress)));

    match &cli.command {
        Commands::List => {
            output::write_cleaners(io::stdout().lock(), cli.output, engine.list_cleaners())?;
            Ok(if load_rejections {
                ExitCode::LoadError
            } else {
                ExitCode::Success
            })
        }
        Commands::Preview(args) => {
            let selection = select(&engine, args)?;
            let preview = engine.preview(&selection)?;
            output::write_preview(io::stdout().lock(), cli.output, &preview)?;
            engine.discard();
            Ok(if load_rejections {
                ExitCode::LoadError
            } else {
                ExitCode::Success
            })
        }
        Commands::Clean(args) => {
            let selection = select(&engine, &args.select)?;
            commit_confirmed(&engine, &selection, args.yes, cli.output, load_rejections)
        }
        Commands::Shred(args) => {
            let selection = engine.default_selection();
            commit_confirmed(&engine, &selection, args.yes, cli.output, false)
        }
    }
}

/// Layer command-line flags over the loaded configuration.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if !cli.cleaner_dirs.is_empty() {
        config.cleaner_dirs.clone_from(&cli.cleaner_dirs);
    }
    config.exclusions.extend(cli.exclusions.iter().cloned());

    match &cli.command {
        Commands::Clean(args) => {
            config.shred |= args.shred;
            if args.wipe_limit.is_some() {
                config.wipe_limit = args.wipe_limit;
            }
        }
        Commands::Shred(args) => {
            config.shred = true;
            if let Some(passes) = args.passes {
                config.shred_passes = passes;
            }
        }
        Commands::List | Commands::Preview(_) => {}
    }
}

fn select(engine: &Engine, args: &SelectArgs) -> anyhow::Result<Selection> {
    let mut ids = args.options.clone();
    if args.defaults {
        ids.extend(engine.default_selection().keys().iter().map(ToString::to_string));
    }
    Ok(engine.select(&ids)?)
}

/// Preview, then commit only when confirmed.
///
/// Without confirmation the preview is printed and the command fails, so a
/// script that forgets `--yes` never deletes anything.
fn commit_confirmed(
    engine: &Engine,
    selection: &Selection,
    confirmed: bool,
    format: OutputFormat,
    load_rejections: bool,
) -> anyhow::Result<ExitCode> {
    let preview = engine.preview(selection)?;
    if !confirmed {
        output::write_preview(io::stdout().lock(), format, &preview)?;
        engine.discard();
        bail!("nothing was deleted; pass --yes to clean the targets above");
    }

    for cleaner in engine.list_cleaners() {
        if let Some(warning) = &cleaner.warning {
            if selection.keys().iter().any(|k| k.cleaner == cleaner.id) {
                log::warn!("{}: {}", cleaner.name, warning);
            }
        }
    }

    let report = engine.commit(selection)?;
    let code = ExitCode::for_run(&report, load_rejections);
    output::write_report(io::stdout().lock(), format, &report, code)?;
    Ok(code)
}

fn report_rejections(loaded: &LoadReport) {
    for rejected in &loaded.rejected {
        log::warn!("Rejected cleaner definition: {rejected}");
    }
    log::info!(
        "Loaded {} cleaner(s) with {} option(s), {} rejected",
        loaded.cleaners.len(),
        loaded.option_count(),
        loaded.rejected.len()
    );
}

/// Build the cleaner behind `cleanbit shred`.
///
/// Files are shredded; directories are walked and every file below them is
/// shredded before the directory itself is removed.
fn shred_cleaner(paths: &[PathBuf]) -> anyhow::Result<Cleaner> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for path in paths {
        let path = std::path::absolute(path)
            .with_context(|| format!("resolving {}", path.display()))?;
        if is_real_dir(&path) {
            dirs.push(path);
        } else {
            files.push(path);
        }
    }

    let mut cleaner = Cleaner::ad_hoc_shred(&files);
    if let Some(option) = cleaner.options.first_mut() {
        option
            .actions
            .extend(dirs.iter().map(|dir| Action::DeletePath {
                pattern: literal_pattern(&dir.to_string_lossy()),
                recursive: true,
                regex: None,
            }));
    }
    Ok(cleaner)
}

fn is_real_dir(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}
