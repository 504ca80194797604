//! Action resolution and execution.
//!
//! The [`Resolver`] is the single place where a declared [`Action`] meets
//! the host: preview expands it into vetted [`MatchResult`]s, commit
//! executes one result at a time. Both phases share the size estimation and
//! safety checks, so what preview reports is what commit acts on.
//!
//! - [`delete`]: removal of files, links and empty directories
//! - [`shred`]: overwrite then remove
//! - [`command`]: external programs
//! - [`wipe`]: free space filling
//!
//! ```no_run
//! use cleanbit::actions::{Resolver, ResolverConfig};
//! use cleanbit::definitions::{Action, OptionKey};
//! use cleanbit::matcher::HostEnvironment;
//! use cleanbit::safety::{ExclusionSet, SafetyFilter};
//! use cleanbit::signal::CancelToken;
//!
//! let env = HostEnvironment::from_process();
//! let filter = SafetyFilter::new(ExclusionSet::builtin(&env), None);
//! let config = ResolverConfig::default();
//! let resolver = Resolver::new(&env, &filter, &config);
//!
//! let action = Action::DeletePath {
//!     pattern: "~/.cache/thumbnails/*".into(),
//!     recursive: true,
//!     regex: None,
//! };
//! let key = OptionKey::new("system", "thumbnails");
//! let preview = resolver
//!     .preview_action(&key, 0, &action, &CancelToken::new())
//!     .unwrap();
//! println!("{} target(s)", preview.results.len());
//! ```

pub mod command;
pub mod delete;
pub mod shred;
pub mod wipe;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::definitions::{Action, OptionKey};
use crate::matcher::{self, Expansion, Hive, HostEnvironment, MatchError, PathPattern};
use crate::outcome::{FailureKind, RunOutcome, SkipReason, SkipRecord};
use crate::safety::SafetyFilter;
use crate::signal::CancelToken;
use crate::target::{
    Disposition, FsTarget, MatchResult, RegistryTarget, Target, TargetId, TargetKind,
};

pub use command::{run_command, CommandError, CommandOutput, OutputRules};
pub use delete::{DeleteError, DeleteResult};
pub use shred::{ShredError, Shredder};
pub use wipe::{WipeError, Wiper};

/// Any commit-time action error.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Delete(#[from] DeleteError),

    #[error(transparent)]
    Shred(#[from] ShredError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Wipe(#[from] WipeError),
}

impl ActionError {
    /// The outcome recorded for this error.
    #[must_use]
    pub fn to_outcome(&self) -> RunOutcome {
        match self {
            Self::Delete(e) => e.to_outcome(),
            Self::Shred(e) => e.to_outcome(),
            Self::Command(e) => e.to_outcome(),
            Self::Wipe(e) => e.to_outcome(),
        }
    }
}

/// Policy values the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upgrade file deletions to shredding.
    pub shred: bool,
    /// Overwrite passes per shredded file.
    pub shred_passes: u32,
    /// Upper bound on bytes written by a free space wipe.
    pub wipe_limit: Option<u64>,
    /// Time limit for external commands.
    pub command_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            shred: false,
            shred_passes: 1,
            wipe_limit: None,
            command_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Targets and skips produced by previewing one action.
#[derive(Debug, Default, Clone)]
pub struct ActionPreview {
    /// Vetted targets in expansion order.
    pub results: Vec<MatchResult>,
    /// Candidates and patterns that were not usable.
    pub skipped: Vec<SkipRecord>,
}

/// Expands actions into targets and executes them.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    env: &'a HostEnvironment,
    filter: &'a SafetyFilter,
    config: &'a ResolverConfig,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over the given environment, filter and policy.
    #[must_use]
    pub fn new(
        env: &'a HostEnvironment,
        filter: &'a SafetyFilter,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            env,
            filter,
            config,
        }
    }

    /// Expand `action` into vetted targets without touching anything.
    ///
    /// Problems with a single pattern or candidate become skip records.
    ///
    /// # Errors
    ///
    /// Only [`MatchError::Cancelled`].
    pub fn preview_action(
        &self,
        key: &OptionKey,
        action_index: usize,
        action: &Action,
        cancel: &CancelToken,
    ) -> Result<ActionPreview, MatchError> {
        let mut preview = ActionPreview::default();
        let scope = Scope {
            key,
            action_index,
            cancel,
        };

        match action {
            Action::DeletePath {
                pattern,
                recursive,
                regex,
            } => {
                let expanded = PathPattern::new(pattern)
                    .recursive(*recursive)
                    .with_name_filter(regex.as_deref())
                    .and_then(|p| p.expand(self.env, cancel));
                self.admit_expansion(&scope, pattern, expanded, &mut preview, |kind| {
                    if kind == TargetKind::File && self.config.shred {
                        Disposition::Shred
                    } else {
                        Disposition::Delete
                    }
                })?;
            }
            Action::ShredPath { pattern } => {
                let expanded = PathPattern::new(pattern).expand(self.env, cancel);
                self.admit_expansion(&scope, pattern, expanded, &mut preview, |kind| {
                    if kind == TargetKind::File {
                        Disposition::Shred
                    } else {
                        Disposition::Delete
                    }
                })?;
            }
            Action::DeleteRegistryKey {
                hive,
                key_path,
                recursive,
            } => {
                let subject = format!("{hive}\\{key_path}");
                if let Some(hive) = scope.parse_hive(hive, &subject, &mut preview) {
                    let resolved = matcher::resolve_registry_key(hive, key_path);
                    let disposition = if *recursive {
                        Disposition::DeleteTree
                    } else {
                        Disposition::Delete
                    };
                    self.admit_registry(
                        &scope,
                        &subject,
                        resolved,
                        TargetKind::RegistryKey,
                        disposition,
                        &mut preview,
                    );
                }
            }
            Action::DeleteRegistryValue {
                hive,
                key_path,
                value_name,
            } => {
                let subject = format!("{hive}\\{key_path} [{value_name}]");
                if let Some(hive) = scope.parse_hive(hive, &subject, &mut preview) {
                    let resolved = matcher::resolve_registry_value(hive, key_path, value_name);
                    self.admit_registry(
                        &scope,
                        &subject,
                        resolved,
                        TargetKind::RegistryValue,
                        Disposition::Delete,
                        &mut preview,
                    );
                }
            }
            Action::RunCommand {
                executable,
                args,
                freed_space_regex,
                error_line_regexes,
            } => {
                let output = OutputRules {
                    freed_space: freed_space_regex.clone(),
                    error_lines: error_line_regexes.clone(),
                };
                self.preview_command(&scope, executable, args, output, &mut preview);
            }
            Action::WipeFreeSpace { root } => {
                self.preview_wipe(&scope, root, &mut preview);
            }
        }

        Ok(preview)
    }

    fn admit_expansion(
        &self,
        scope: &Scope<'_>,
        pattern: &str,
        expanded: Result<Expansion, MatchError>,
        preview: &mut ActionPreview,
        disposition: impl Fn(TargetKind) -> Disposition,
    ) -> Result<(), MatchError> {
        let expansion = match expanded {
            Ok(expansion) => expansion,
            Err(MatchError::Cancelled) => return Err(MatchError::Cancelled),
            Err(e) => {
                log::debug!("Pattern {} skipped: {}", pattern, e);
                let reason = e.skip_reason().unwrap_or(SkipReason::NotFound);
                preview.skipped.push(scope.skip(pattern, reason));
                return Ok(());
            }
        };

        for (path, reason) in expansion.skipped {
            preview.skipped.push(scope.skip(path.display().to_string(), reason));
        }

        for candidate in expansion.candidates {
            if scope.cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }
            let target = TargetId::path(&candidate.path);
            if let Err(reason) = self.filter.check(&target, candidate.kind) {
                preview.skipped.push(scope.skip(candidate.path.display().to_string(), reason));
                continue;
            }

            let bytes = match FsTarget::new(&candidate.path, candidate.kind).estimate_size() {
                Ok(bytes) => bytes,
                Err(e) => {
                    let reason = if matches!(e, DeleteError::PermissionDenied(_)) {
                        SkipReason::PermissionDenied
                    } else {
                        SkipReason::NotFound
                    };
                    preview.skipped.push(scope.skip(e.target().to_string(), reason));
                    continue;
                }
            };

            preview.results.push(MatchResult {
                option: scope.key.clone(),
                action_index: scope.action_index,
                target,
                kind: candidate.kind,
                bytes,
                disposition: disposition(candidate.kind),
                root: Some(candidate.root),
            });
        }
        Ok(())
    }

    fn admit_registry(
        &self,
        scope: &Scope<'_>,
        subject: &str,
        resolved: std::io::Result<Option<TargetId>>,
        kind: TargetKind,
        disposition: Disposition,
        preview: &mut ActionPreview,
    ) {
        let target = match resolved {
            Ok(Some(target)) => target,
            Ok(None) => return,
            Err(e) => {
                let reason = match e.kind() {
                    std::io::ErrorKind::PermissionDenied => SkipReason::PermissionDenied,
                    std::io::ErrorKind::Unsupported => SkipReason::Unsupported,
                    _ => SkipReason::NotFound,
                };
                preview.skipped.push(scope.skip(subject, reason));
                return;
            }
        };
        self.admit(scope, target, kind, 0, disposition, None, preview);
    }

    fn preview_command(
        &self,
        scope: &Scope<'_>,
        executable: &str,
        args: &[String],
        output: OutputRules,
        preview: &mut ActionPreview,
    ) {
        let program = match self.env.expand_plain(executable) {
            Ok(program) => program,
            Err(e) => {
                let reason = e.skip_reason().unwrap_or(SkipReason::NotFound);
                preview.skipped.push(scope.skip(executable, reason));
                return;
            }
        };
        let Ok(resolved) = command::resolve_executable(&program) else {
            log::debug!("Executable {} not found", program);
            preview
                .skipped
                .push(scope.skip(&program, SkipReason::ExecutableNotFound(program.clone())));
            return;
        };
        let expanded: Result<Vec<String>, MatchError> =
            args.iter().map(|a| self.env.expand_plain(a)).collect();
        let args = match expanded {
            Ok(args) => args,
            Err(e) => {
                let reason = e.skip_reason().unwrap_or(SkipReason::NotFound);
                preview.skipped.push(scope.skip(&program, reason));
                return;
            }
        };

        let target = TargetId::Command {
            executable: resolved,
            args,
            output,
        };
        self.admit(
            scope,
            target,
            TargetKind::Command,
            0,
            Disposition::Execute,
            None,
            preview,
        );
    }

    fn preview_wipe(&self, scope: &Scope<'_>, root: &str, preview: &mut ActionPreview) {
        let root = match self.env.expand_plain(root) {
            Ok(expanded) => PathBuf::from(expanded),
            Err(e) => {
                let reason = e.skip_reason().unwrap_or(SkipReason::NotFound);
                preview.skipped.push(scope.skip(root, reason));
                return;
            }
        };
        let subject = root.display().to_string();
        if !root.is_absolute() {
            let reason = SkipReason::InvalidPattern("wipe root must be absolute".to_string());
            preview.skipped.push(scope.skip(subject, reason));
            return;
        }
        if !root.is_dir() {
            preview.skipped.push(scope.skip(subject, SkipReason::NotFound));
            return;
        }

        let available = wipe::available_space(&root).unwrap_or_else(|| {
            log::debug!("No volume information for {}", root.display());
            0
        });
        let bytes = Wiper::new(self.config.wipe_limit).planned_bytes(available);
        let target = TargetId::Volume { root: root.clone() };
        self.admit(
            scope,
            target,
            TargetKind::FreeSpace,
            bytes,
            Disposition::Wipe,
            Some(root),
            preview,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn admit(
        &self,
        scope: &Scope<'_>,
        target: TargetId,
        kind: TargetKind,
        bytes: u64,
        disposition: Disposition,
        root: Option<PathBuf>,
        preview: &mut ActionPreview,
    ) {
        if let Err(reason) = self.filter.check(&target, kind) {
            preview.skipped.push(scope.skip(target.to_string(), reason));
            return;
        }
        preview.results.push(MatchResult {
            option: scope.key.clone(),
            action_index: scope.action_index,
            target,
            kind,
            bytes,
            disposition,
            root,
        });
    }

    /// Act on one previewed target.
    ///
    /// The target is re-checked first; a target that vanished, changed kind
    /// or became protected since preview is skipped. Never panics and never
    /// returns an error: every problem becomes the outcome.
    #[must_use]
    pub fn execute(&self, item: &MatchResult, cancel: &CancelToken) -> RunOutcome {
        if let Err(reason) = self.filter.recheck(item) {
            log::debug!("Skipped {}: {}", item.target, reason);
            return RunOutcome::Skipped(reason);
        }

        let result: Result<u64, ActionError> = match &item.target {
            TargetId::Path { path } => self.execute_path(path, item.kind, item.disposition),
            TargetId::RegistryKey { hive, key_path } => {
                let recursive = item.disposition == Disposition::DeleteTree;
                return registry_outcome(RegistryTarget::key(*hive, key_path, recursive).delete());
            }
            TargetId::RegistryValue {
                hive,
                key_path,
                value_name,
            } => {
                return registry_outcome(
                    RegistryTarget::value(*hive, key_path, value_name).delete(),
                );
            }
            TargetId::Command {
                executable,
                args,
                output,
            } => run_command(executable, args, self.config.command_timeout)
                .and_then(|out| output.freed_bytes(&executable.display().to_string(), &out))
                .map_err(ActionError::from),
            TargetId::Volume { root } => Wiper::new(self.config.wipe_limit)
                .wipe(root, cancel)
                .map_err(ActionError::from),
        };

        match result {
            Ok(bytes) => RunOutcome::Deleted(bytes),
            Err(e) => {
                let outcome = e.to_outcome();
                if outcome.is_failed() {
                    log::warn!("Failed {}: {}", item.target, e);
                } else {
                    log::debug!("Skipped {}: {}", item.target, e);
                }
                outcome
            }
        }
    }

    fn execute_path(
        &self,
        path: &Path,
        kind: TargetKind,
        disposition: Disposition,
    ) -> Result<u64, ActionError> {
        if disposition == Disposition::Shred && kind == TargetKind::File {
            return Ok(Shredder::new(self.config.shred_passes).shred_file(path)?);
        }
        Ok(FsTarget::new(path, kind).delete()?)
    }
}

fn registry_outcome(result: Result<u64, DeleteError>) -> RunOutcome {
    match result {
        Ok(bytes) => RunOutcome::Deleted(bytes),
        Err(e) => match e.to_outcome() {
            RunOutcome::Failed(FailureKind::Io, message) => {
                RunOutcome::Failed(FailureKind::Registry, message)
            }
            other => other,
        },
    }
}

/// The option and action a preview is working on.
struct Scope<'s> {
    key: &'s OptionKey,
    action_index: usize,
    cancel: &'s CancelToken,
}

impl Scope<'_> {
    fn skip(&self, subject: impl Into<String>, reason: SkipReason) -> SkipRecord {
        SkipRecord::new(self.key.clone(), subject, reason)
    }

    fn parse_hive(
        &self,
        hive: &str,
        subject: &str,
        preview: &mut ActionPreview,
    ) -> Option<Hive> {
        match Hive::from_str(hive) {
            Ok(hive) => Some(hive),
            Err(message) => {
                preview
                    .skipped
                    .push(self.skip(subject, SkipReason::InvalidPattern(message)));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::ExclusionSet;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        env: HostEnvironment,
        filter: SafetyFilter,
        config: ResolverConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let env = HostEnvironment::new(dir.path());
            Self {
                dir,
                env,
                filter: SafetyFilter::new(ExclusionSet::empty(), None),
                config: ResolverConfig::default(),
            }
        }

        fn resolver(&self) -> Resolver<'_> {
            Resolver::new(&self.env, &self.filter, &self.config)
        }

        fn write(&self, rel: &str, len: usize) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, vec![b'x'; len]).unwrap();
            path
        }
    }

    fn key() -> OptionKey {
        OptionKey::new("app", "cache")
    }

    fn delete_path(pattern: &str) -> Action {
        Action::DeletePath {
            pattern: pattern.into(),
            recursive: false,
            regex: None,
        }
    }

    #[test]
    fn test_preview_delete_path_sums_sizes() {
        let fx = Fixture::new();
        fx.write("cache/a.tmp", 1000);
        fx.write("cache/b.tmp", 24);
        fx.write("cache/keep.dat", 7);

        let preview = fx
            .resolver()
            .preview_action(&key(), 0, &delete_path("~/cache/*.tmp"), &CancelToken::new())
            .unwrap();

        assert_eq!(preview.results.len(), 2);
        assert_eq!(preview.results.iter().map(|r| r.bytes).sum::<u64>(), 1024);
        assert!(preview
            .results
            .iter()
            .all(|r| r.disposition == Disposition::Delete));
        assert!(fx.dir.path().join("cache/a.tmp").exists());
    }

    #[test]
    fn test_shred_setting_upgrades_files() {
        let mut fx = Fixture::new();
        fx.config.shred = true;
        fx.write("cache/a.tmp", 10);

        let preview = fx
            .resolver()
            .preview_action(&key(), 0, &delete_path("~/cache/*"), &CancelToken::new())
            .unwrap();
        assert_eq!(preview.results[0].disposition, Disposition::Shred);
    }

    #[test]
    fn test_excluded_candidate_becomes_skip() {
        let mut fx = Fixture::new();
        let protected = fx.write("cache/protected.tmp", 10);
        fx.write("cache/other.tmp", 10);
        fx.filter = SafetyFilter::new(
            ExclusionSet::empty()
                .with_user_rules([protected.to_string_lossy()], &fx.env)
                .unwrap(),
            None,
        );

        let preview = fx
            .resolver()
            .preview_action(&key(), 0, &delete_path("~/cache/*.tmp"), &CancelToken::new())
            .unwrap();

        assert_eq!(preview.results.len(), 1);
        assert!(preview
            .results
            .iter()
            .all(|r| r.target != TargetId::path(&protected)));
        assert!(matches!(
            preview.skipped[0].reason,
            SkipReason::Excluded(_)
        ));
    }

    #[test]
    fn test_unresolved_variable_is_skip() {
        let fx = Fixture::new();
        let preview = fx
            .resolver()
            .preview_action(
                &key(),
                0,
                &delete_path("$CLEANBIT_UNSET_VARIABLE/*"),
                &CancelToken::new(),
            )
            .unwrap();
        assert!(preview.results.is_empty());
        assert_eq!(
            preview.skipped[0].reason,
            SkipReason::UnresolvedVariable("CLEANBIT_UNSET_VARIABLE".into())
        );
    }

    #[test]
    fn test_missing_executable_is_skip() {
        let fx = Fixture::new();
        let action = Action::RunCommand {
            executable: "cleanbit-no-such-tool".into(),
            args: vec![],
            freed_space_regex: None,
            error_line_regexes: vec![],
        };
        let preview = fx
            .resolver()
            .preview_action(&key(), 0, &action, &CancelToken::new())
            .unwrap();
        assert!(preview.results.is_empty());
        assert!(matches!(
            preview.skipped[0].reason,
            SkipReason::ExecutableNotFound(_)
        ));
    }

    #[test]
    fn test_registry_actions_are_empty_off_windows() {
        if matcher::registry::AVAILABLE {
            return;
        }
        let fx = Fixture::new();
        let action = Action::DeleteRegistryKey {
            hive: "HKCU".into(),
            key_path: "Software\\Example".into(),
            recursive: true,
        };
        let preview = fx
            .resolver()
            .preview_action(&key(), 0, &action, &CancelToken::new())
            .unwrap();
        assert!(preview.results.is_empty());
        assert!(preview.skipped.is_empty());
    }

    #[test]
    fn test_wipe_preview_reports_free_space_kind() {
        let mut fx = Fixture::new();
        fx.config.wipe_limit = Some(4096);
        let action = Action::WipeFreeSpace {
            root: "~".into(),
        };
        let preview = fx
            .resolver()
            .preview_action(&key(), 0, &action, &CancelToken::new())
            .unwrap();

        assert_eq!(preview.results.len(), 1);
        let result = &preview.results[0];
        assert_eq!(result.kind, TargetKind::FreeSpace);
        assert_eq!(result.disposition, Disposition::Wipe);
        assert!(result.bytes <= 4096);
    }

    #[test]
    fn test_execute_deletes_and_reports_bytes() {
        let fx = Fixture::new();
        let path = fx.write("cache/a.tmp", 512);
        let resolver = fx.resolver();
        let preview = resolver
            .preview_action(&key(), 0, &delete_path("~/cache/*.tmp"), &CancelToken::new())
            .unwrap();

        let outcome = resolver.execute(&preview.results[0], &CancelToken::new());
        assert_eq!(outcome, RunOutcome::Deleted(512));
        assert!(!path.exists());
    }

    #[test]
    fn test_execute_vanished_target_is_not_found() {
        let fx = Fixture::new();
        let path = fx.write("cache/a.tmp", 16);
        let resolver = fx.resolver();
        let preview = resolver
            .preview_action(&key(), 0, &delete_path("~/cache/*.tmp"), &CancelToken::new())
            .unwrap();

        fs::remove_file(&path).unwrap();
        let outcome = resolver.execute(&preview.results[0], &CancelToken::new());
        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::NotFound));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_failing_command() {
        let fx = Fixture::new();
        let resolver = fx.resolver();
        let action = Action::RunCommand {
            executable: "false".into(),
            args: vec![],
            freed_space_regex: None,
            error_line_regexes: vec![],
        };
        let preview = resolver
            .preview_action(&key(), 0, &action, &CancelToken::new())
            .unwrap();

        let outcome = resolver.execute(&preview.results[0], &CancelToken::new());
        assert!(matches!(
            outcome,
            RunOutcome::Failed(FailureKind::ExternalCommand, _)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_command_reports_freed_space() {
        let fx = Fixture::new();
        let resolver = fx.resolver();
        let action = Action::RunCommand {
            executable: "sh".into(),
            args: vec!["-c".into(), "echo 'Vacuuming done, freed 8.0M'".into()],
            freed_space_regex: Some(r"freed (\S+)".into()),
            error_line_regexes: vec!["^error".into()],
        };
        let preview = resolver
            .preview_action(&key(), 0, &action, &CancelToken::new())
            .unwrap();

        let outcome = resolver.execute(&preview.results[0], &CancelToken::new());
        assert_eq!(outcome, RunOutcome::Deleted(8_000_000));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_command_error_line_is_failure() {
        let fx = Fixture::new();
        let resolver = fx.resolver();
        let action = Action::RunCommand {
            executable: "sh".into(),
            args: vec!["-c".into(), "echo 'error: cache locked'".into()],
            freed_space_regex: None,
            error_line_regexes: vec!["^error".into()],
        };
        let preview = resolver
            .preview_action(&key(), 0, &action, &CancelToken::new())
            .unwrap();

        let outcome = resolver.execute(&preview.results[0], &CancelToken::new());
        assert!(matches!(
            outcome,
            RunOutcome::Failed(FailureKind::ExternalCommand, ref message) if message.contains("cache locked")
        ));
    }

    #[test]
    fn test_preview_honors_cancellation() {
        let fx = Fixture::new();
        fx.write("cache/a.tmp", 1);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result =
            fx.resolver()
                .preview_action(&key(), 0, &delete_path("~/cache/*.tmp"), &cancel);
        assert!(matches!(result, Err(MatchError::Cancelled)));
    }
}
