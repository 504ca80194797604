//! Two-phase execution engine.
//!
//! The [`Engine`] owns the loaded cleaners and runs the preview/commit
//! protocol over a [`Selection`] of options:
//!
//! ```text
//! Idle -> Previewing -> Previewed -> Committing -> Done | PartialFailure
//! ```
//!
//! Preview expands every selected action on a rayon pool and touches
//! nothing. Commit executes a [`CommitPlan`] sequentially, re-checking each
//! target first, and records exactly one outcome per planned item. Nothing
//! aborts a commit: failures are recorded and the run continues.
//!
//! # Example
//!
//! ```no_run
//! use cleanbit::definitions::load_dirs;
//! use cleanbit::engine::{Engine, EngineConfig};
//! use cleanbit::matcher::HostEnvironment;
//! use std::path::PathBuf;
//!
//! let report = load_dirs(&[PathBuf::from("/usr/share/cleanbit/cleaners")]);
//! let engine = Engine::new(report.cleaners, EngineConfig::new(HostEnvironment::from_process()))?;
//!
//! let selection = engine.select(&["firefox.cache"])?;
//! let preview = engine.preview(&selection)?;
//! println!("{} bytes reclaimable", preview.estimated_bytes);
//!
//! let run = engine.commit(&selection)?;
//! println!("{}", run.summary());
//! # Ok::<(), cleanbit::engine::EngineError>(())
//! ```

pub mod plan;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::actions::{ActionPreview, Resolver, ResolverConfig};
use crate::config::Config;
use crate::definitions::{Action, Cleaner, CleanerOption, OptionKey};
use crate::matcher::{HostEnvironment, MatchError};
use crate::outcome::{OutcomeRecord, RunOutcome, SkipReason, SkipRecord};
use crate::progress::{ProgressCallback, PHASE_COMMIT, PHASE_PREVIEW};
use crate::safety::{ExclusionError, ExclusionSet, OpenFiles, ProcessProbe, SafetyFilter, SysinfoProbe};
use crate::signal::CancelToken;
use crate::target::{MatchResult, TargetKind};

pub use plan::CommitPlan;

/// Lifecycle state of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Nothing pending.
    Idle,
    /// A preview is running.
    Previewing,
    /// A preview is pending commit.
    Previewed,
    /// A commit is running.
    Committing,
    /// The last commit finished without failures.
    Done,
    /// The last commit finished with at least one failure.
    PartialFailure,
}

impl EngineState {
    fn is_busy(self) -> bool {
        matches!(self, Self::Previewing | Self::Committing)
    }
}

/// Errors that stop an engine operation as a whole.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No cleaner definitions were available.
    #[error("no cleaner definitions could be loaded")]
    NoCleaners,

    /// A selected option does not exist.
    #[error("unknown option '{key}'{}", did_you_mean(.suggestion))]
    UnknownOption {
        key: String,
        suggestion: Option<String>,
    },

    /// The selection contains no options.
    #[error("no options selected")]
    EmptySelection,

    /// The operation was cancelled; nothing is pending.
    #[error("operation cancelled")]
    Cancelled,

    /// Another operation is in progress.
    #[error("cannot {operation} while the engine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },

    /// The preview worker pool could not be created.
    #[error("failed to start preview workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

/// Ordered set of selected options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection {
    keys: Vec<OptionKey>,
}

impl Selection {
    /// The selected option keys, in selection order.
    #[must_use]
    pub fn keys(&self) -> &[OptionKey] {
        &self.keys
    }

    /// Number of selected options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether `key` is selected.
    #[must_use]
    pub fn contains(&self, key: &OptionKey) -> bool {
        self.keys.contains(key)
    }

    fn push(&mut self, key: OptionKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }
}

/// Everything the engine needs besides the cleaners.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Protected locations; immutable for the engine's lifetime.
    pub exclusions: ExclusionSet,
    /// Environment used for pattern expansion.
    pub env: HostEnvironment,
    /// Shred, wipe and command policy.
    pub resolver: ResolverConfig,
    /// Refuse to delete files held open by running processes.
    pub protect_open_files: bool,
    /// Skip cleaners whose application is running.
    pub skip_running_apps: bool,
    /// Preview worker threads; zero picks the number of CPUs.
    pub preview_threads: usize,
}

impl EngineConfig {
    /// Built-in exclusions and default policy for `env`.
    #[must_use]
    pub fn new(env: HostEnvironment) -> Self {
        Self {
            exclusions: ExclusionSet::builtin(&env),
            env,
            resolver: ResolverConfig::default(),
            protect_open_files: true,
            skip_running_apps: true,
            preview_threads: 0,
        }
    }

    /// Build from application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a user exclusion is invalid.
    pub fn from_config(config: &Config, env: HostEnvironment) -> Result<Self, ExclusionError> {
        let exclusions = ExclusionSet::builtin(&env).with_user_rules(&config.exclusions, &env)?;
        Ok(Self {
            exclusions,
            env,
            resolver: ResolverConfig {
                shred: config.shred,
                shred_passes: config.shred_passes,
                wipe_limit: config.wipe_limit,
                command_timeout: (config.command_timeout_secs > 0)
                    .then(|| Duration::from_secs(config.command_timeout_secs)),
            },
            protect_open_files: config.protect_open_files,
            skip_running_apps: config.skip_running_apps,
            preview_threads: config.preview_threads,
        })
    }
}

/// Per-option totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptionTotals {
    /// Targets found (preview) or removed (report).
    pub targets: usize,
    /// Bytes estimated (preview) or freed (report).
    pub bytes: u64,
    /// Skipped candidates or items.
    pub skipped: usize,
    /// Failed items.
    pub failed: usize,
}

/// Result of a preview: what commit would do.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    /// Options the preview covers.
    pub selection: Selection,
    /// Vetted targets, in declared option and action order.
    pub results: Vec<MatchResult>,
    /// Candidates that will not be touched, with reasons.
    pub skipped: Vec<SkipRecord>,
    /// Bytes commit is expected to free, counting each target once.
    pub estimated_bytes: u64,
    /// Bytes free space wipes would write.
    pub free_space_bytes: u64,
    /// When the preview was produced.
    pub generated_at: DateTime<Utc>,
}

impl Preview {
    /// Totals per option.
    #[must_use]
    pub fn per_option(&self) -> BTreeMap<OptionKey, OptionTotals> {
        let mut totals: BTreeMap<OptionKey, OptionTotals> = self
            .selection
            .keys()
            .iter()
            .map(|k| (k.clone(), OptionTotals::default()))
            .collect();
        for result in &self.results {
            let entry = totals.entry(result.option.clone()).or_default();
            entry.targets += 1;
            if result.kind != TargetKind::FreeSpace {
                entry.bytes += result.bytes;
            }
        }
        for skip in &self.skipped {
            totals.entry(skip.option.clone()).or_default().skipped += 1;
        }
        totals
    }
}

/// Result of a commit.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When commit started.
    pub started_at: DateTime<Utc>,
    /// When commit finished.
    pub finished_at: DateTime<Utc>,
    /// One record per planned item, then one per merged duplicate.
    pub outcomes: Vec<OutcomeRecord>,
    /// Candidates rejected while resolving.
    pub skipped: Vec<SkipRecord>,
    /// Final engine state.
    pub state: EngineState,
    /// Whether cancellation cut the run short.
    pub cancelled: bool,
}

impl RunReport {
    /// Bytes freed by deletions and shredding.
    #[must_use]
    pub fn bytes_freed(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|r| r.kind != TargetKind::FreeSpace)
            .map(|r| r.outcome.bytes())
            .sum()
    }

    /// Bytes written by free space wipes.
    #[must_use]
    pub fn bytes_wiped(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|r| r.kind == TargetKind::FreeSpace)
            .map(|r| r.outcome.bytes())
            .sum()
    }

    /// Number of items acted on successfully.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_deleted()).count()
    }

    /// Number of skipped items and candidates.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_skipped()).count() + self.skipped.len()
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// Whether any item failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|r| r.outcome.is_failed())
    }

    /// Totals per option.
    #[must_use]
    pub fn per_option(&self) -> BTreeMap<OptionKey, OptionTotals> {
        let mut totals: BTreeMap<OptionKey, OptionTotals> = BTreeMap::new();
        for record in &self.outcomes {
            let entry = totals.entry(record.option.clone()).or_default();
            match &record.outcome {
                RunOutcome::Deleted(bytes) => {
                    entry.targets += 1;
                    if record.kind != TargetKind::FreeSpace {
                        entry.bytes += bytes;
                    }
                }
                RunOutcome::Skipped(_) => entry.skipped += 1,
                RunOutcome::Failed(..) => entry.failed += 1,
            }
        }
        for skip in &self.skipped {
            totals.entry(skip.option.clone()).or_default().skipped += 1;
        }
        totals
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} removed, {} skipped, {} failed, {} freed",
            self.deleted_count(),
            self.skipped_count(),
            self.failed_count(),
            bytesize::ByteSize::b(self.bytes_freed())
        );
        if self.bytes_wiped() > 0 {
            line.push_str(&format!(
                ", {} of free space wiped",
                bytesize::ByteSize::b(self.bytes_wiped())
            ));
        }
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

/// One (option, action) pair to expand.
struct Unit<'c> {
    key: &'c OptionKey,
    index: usize,
    action: &'c Action,
}

/// Runs preview and commit over a fixed set of cleaners.
pub struct Engine {
    cleaners: Vec<Cleaner>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    pending: Mutex<Option<Preview>>,
    probe: Option<Box<dyn ProcessProbe>>,
    progress: Option<Arc<dyn ProgressCallback>>,
    cancel: CancelToken,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cleaners", &self.cleaners.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoCleaners`] if `cleaners` is empty.
    pub fn new(cleaners: Vec<Cleaner>, config: EngineConfig) -> Result<Self, EngineError> {
        if cleaners.is_empty() {
            return Err(EngineError::NoCleaners);
        }
        log::debug!(
            "Engine created with {} cleaner(s), {} user exclusion(s)",
            cleaners.len(),
            config.exclusions.user_rule_count()
        );
        Ok(Self {
            cleaners,
            config,
            state: Mutex::new(EngineState::Idle),
            pending: Mutex::new(None),
            probe: None,
            progress: None,
            cancel: CancelToken::new(),
        })
    }

    /// Use `probe` instead of the live process list.
    #[must_use]
    pub fn with_probe(mut self, probe: impl ProcessProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Report progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Share an existing cancellation token, e.g. the Ctrl+C handler's.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels the running operation from any thread.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The loaded cleaners.
    #[must_use]
    pub fn list_cleaners(&self) -> &[Cleaner] {
        &self.cleaners
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.lock_state()
    }

    /// Request cancellation of the running preview or commit.
    pub fn cancel(&self) {
        log::debug!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Drop the pending preview.
    pub fn discard(&self) {
        let mut state = self.lock_state();
        if *state == EngineState::Previewed {
            *state = EngineState::Idle;
            *self.lock_pending() = None;
        }
    }

    /// Resolve option specifiers into a selection.
    ///
    /// Accepts `cleaner.option` and `cleaner.*`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownOption`] (with a suggestion when one is
    /// close) or [`EngineError::EmptySelection`].
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Selection, EngineError> {
        let mut selection = Selection::default();
        for raw in ids {
            let raw = raw.as_ref().trim();
            if let Some(cleaner_id) = raw.strip_suffix(".*") {
                let cleaner = self
                    .cleaners
                    .iter()
                    .find(|c| c.id == cleaner_id)
                    .ok_or_else(|| EngineError::UnknownOption {
                        key: raw.to_string(),
                        suggestion: suggest(cleaner_id, self.cleaners.iter().map(|c| c.id.clone()))
                            .map(|id| format!("{id}.*")),
                    })?;
                for option in &cleaner.options {
                    selection.push(OptionKey::new(&cleaner.id, &option.id));
                }
                continue;
            }

            let known = raw
                .parse::<OptionKey>()
                .ok()
                .filter(|key| self.lookup(key).is_some());
            match known {
                Some(key) => selection.push(key),
                None => {
                    return Err(EngineError::UnknownOption {
                        key: raw.to_string(),
                        suggestion: suggest(raw, self.all_keys().map(|k| k.to_string())),
                    })
                }
            }
        }

        if selection.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        Ok(selection)
    }

    /// All options enabled by default.
    #[must_use]
    pub fn default_selection(&self) -> Selection {
        let mut selection = Selection::default();
        for cleaner in &self.cleaners {
            for option in cleaner.options.iter().filter(|o| o.default_enabled) {
                selection.push(OptionKey::new(&cleaner.id, &option.id));
            }
        }
        selection
    }

    /// Enumerate what committing `selection` would do, without side effects.
    ///
    /// The preview is kept and reused by a following [`Engine::commit`] of
    /// the same selection.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] if cancelled (nothing is kept),
    /// or a selection or state error.
    pub fn preview(&self, selection: &Selection) -> Result<Preview, EngineError> {
        if selection.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        self.transition("preview", EngineState::Previewing)?;
        self.cancel.reset();
        *self.lock_pending() = None;

        match self.resolve(selection) {
            Ok(preview) => {
                log::info!(
                    "Preview: {} target(s), {} bytes, {} skipped",
                    preview.results.len(),
                    preview.estimated_bytes,
                    preview.skipped.len()
                );
                *self.lock_pending() = Some(preview.clone());
                self.set_state(EngineState::Previewed);
                Ok(preview)
            }
            Err(e) => {
                self.set_state(EngineState::Idle);
                Err(e)
            }
        }
    }

    /// Execute `selection`.
    ///
    /// Uses the pending preview if it covers the same selection, otherwise
    /// resolves afresh. Every target is re-checked before it is touched.
    ///
    /// # Errors
    ///
    /// Only for a bad selection, a busy engine, or cancellation while
    /// resolving afresh. Per-target problems are recorded in the report.
    pub fn commit(&self, selection: &Selection) -> Result<RunReport, EngineError> {
        if selection.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        self.transition("commit", EngineState::Committing)?;
        self.cancel.reset();
        let started_at = Utc::now();

        let pending = self
            .lock_pending()
            .take()
            .filter(|p| p.selection == *selection);
        let preview = match pending {
            Some(preview) => preview,
            None => match self.resolve(selection) {
                Ok(preview) => preview,
                Err(e) => {
                    self.set_state(EngineState::Idle);
                    return Err(e);
                }
            },
        };

        let filter = self.safety_filter();
        let resolver = Resolver::new(&self.config.env, &filter, &self.config.resolver);
        let running = self.running_applications(selection);

        let mut outcomes = Vec::with_capacity(preview.results.len());
        let mut planned = Vec::with_capacity(preview.results.len());
        for result in preview.results {
            match running.get(&result.option.cleaner) {
                Some(app) => outcomes.push(OutcomeRecord {
                    option: result.option,
                    target: result.target,
                    kind: result.kind,
                    outcome: RunOutcome::Skipped(SkipReason::ApplicationRunning(app.clone())),
                }),
                None => planned.push(result),
            }
        }

        let plan = CommitPlan::build(planned);
        let duplicates = plan.duplicates().to_vec();
        self.notify_start(PHASE_COMMIT, plan.len());

        let mut cancelled = false;
        for (n, item) in plan.into_items().into_iter().enumerate() {
            let outcome = if cancelled || self.cancel.is_cancelled() {
                cancelled = true;
                RunOutcome::Skipped(SkipReason::Cancelled)
            } else {
                resolver.execute(&item, &self.cancel)
            };
            if let Some(progress) = &self.progress {
                progress.on_item_completed(outcome.bytes());
                progress.on_progress(n + 1, &item.target.to_string());
            }
            outcomes.push(OutcomeRecord {
                option: item.option,
                target: item.target,
                kind: item.kind,
                outcome,
            });
        }
        outcomes.extend(duplicates);
        self.notify_end(PHASE_COMMIT);

        let cancelled = cancelled || self.cancel.is_cancelled();
        let state = if outcomes.iter().any(|r| r.outcome.is_failed()) {
            EngineState::PartialFailure
        } else {
            EngineState::Done
        };
        self.set_state(state);

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
            skipped: preview.skipped,
            state,
            cancelled,
        };
        log::info!("Commit finished: {}", report.summary());
        Ok(report)
    }

    /// Expand the selection into a preview.
    fn resolve(&self, selection: &Selection) -> Result<Preview, EngineError> {
        let filter = self.safety_filter();
        let resolver = Resolver::new(&self.config.env, &filter, &self.config.resolver);
        let running = self.running_applications(selection);

        let mut skipped = Vec::new();
        let mut units = Vec::new();
        for key in selection.keys() {
            let (cleaner, option) = self.lookup(key).ok_or_else(|| EngineError::UnknownOption {
                key: key.to_string(),
                suggestion: None,
            })?;
            if let Some(app) = running.get(&cleaner.id) {
                skipped.push(SkipRecord::new(
                    key.clone(),
                    cleaner.name.clone(),
                    SkipReason::ApplicationRunning(app.clone()),
                ));
                continue;
            }
            units.extend(
                option
                    .actions
                    .iter()
                    .enumerate()
                    .map(|(index, action)| Unit { key, index, action }),
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.preview_threads)
            .build()?;
        let done = AtomicUsize::new(0);
        self.notify_start(PHASE_PREVIEW, units.len());

        let expanded: Vec<Result<ActionPreview, MatchError>> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    let preview =
                        resolver.preview_action(unit.key, unit.index, unit.action, &self.cancel);
                    if let Some(progress) = &self.progress {
                        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                        progress.on_progress(n, &unit.key.to_string());
                    }
                    preview
                })
                .collect()
        });
        self.notify_end(PHASE_PREVIEW);

        let mut results = Vec::new();
        for action_preview in expanded {
            let action_preview = action_preview.map_err(|_| EngineError::Cancelled)?;
            results.extend(action_preview.results);
            skipped.extend(action_preview.skipped);
        }
        if self.cancel.is_cancelled() {
            log::info!("Preview cancelled");
            return Err(EngineError::Cancelled);
        }

        let plan = CommitPlan::build(results.clone());
        Ok(Preview {
            selection: selection.clone(),
            results,
            skipped,
            estimated_bytes: plan.total_bytes(),
            free_space_bytes: plan.wipe_bytes(),
            generated_at: Utc::now(),
        })
    }

    fn safety_filter(&self) -> SafetyFilter {
        let open_files = self.config.protect_open_files.then(OpenFiles::snapshot);
        SafetyFilter::new(self.config.exclusions.clone(), open_files)
    }

    /// Cleaner id -> running application name, for selected cleaners.
    fn running_applications(&self, selection: &Selection) -> HashMap<String, String> {
        let mut running = HashMap::new();
        if !self.config.skip_running_apps {
            return running;
        }
        let guarded: Vec<&Cleaner> = self
            .cleaners
            .iter()
            .filter(|c| !c.running.is_empty())
            .filter(|c| selection.keys().iter().any(|k| k.cleaner == c.id))
            .collect();
        if guarded.is_empty() {
            return running;
        }

        let captured;
        let probe: &dyn ProcessProbe = match &self.probe {
            Some(probe) => probe.as_ref(),
            None => {
                captured = SysinfoProbe::capture();
                &captured
            }
        };
        for cleaner in guarded {
            if let Some(app) = cleaner.running.iter().find(|name| probe.is_running(name)) {
                log::info!("Skipping {}: {} is running", cleaner.id, app);
                running.insert(cleaner.id.clone(), app.clone());
            }
        }
        running
    }

    fn lookup(&self, key: &OptionKey) -> Option<(&Cleaner, &CleanerOption)> {
        let cleaner = self.cleaners.iter().find(|c| c.id == key.cleaner)?;
        cleaner.option(&key.option).map(|option| (cleaner, option))
    }

    fn all_keys(&self) -> impl Iterator<Item = OptionKey> + '_ {
        self.cleaners.iter().flat_map(|c| {
            c.options
                .iter()
                .map(move |o| OptionKey::new(&c.id, &o.id))
        })
    }

    fn transition(&self, operation: &'static str, to: EngineState) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        if state.is_busy() {
            return Err(EngineError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    fn set_state(&self, state: EngineState) {
        *self.lock_state() = state;
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<Preview>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_start(&self, phase: &str, total: usize) {
        if let Some(progress) = &self.progress {
            progress.on_phase_start(phase, total);
        }
    }

    fn notify_end(&self, phase: &str) {
        if let Some(progress) = &self.progress {
            progress.on_phase_end(phase);
        }
    }
}

/// Closest candidate to `input`, if any is reasonably close.
fn suggest(input: &str, candidates: impl Iterator<Item = String>) -> Option<String> {
    candidates
        .map(|c| (strsim::jaro_winkler(input, &c), c))
        .filter(|(score, _)| *score >= 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}
