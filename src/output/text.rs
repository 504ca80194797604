//! Human-readable terminal output.
//!
//! Colors go through `yansi`, so `--no-color`, `NO_COLOR` and non-terminal
//! output are all handled by the global switch set at startup.

use std::collections::BTreeMap;
use std::io::Write;

use bytesize::ByteSize;
use yansi::Paint;

use super::OutputError;
use crate::definitions::{Cleaner, OptionKey};
use crate::engine::{OptionTotals, Preview, RunReport};
use crate::outcome::{RunOutcome, SkipRecord};
use crate::target::{Disposition, TargetKind};

/// Text formatter writing to any [`Write`].
pub struct TextOutput<W: Write> {
    writer: W,
}

impl<W: Write> TextOutput<W> {
    /// Create a formatter over `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Cleaners with their options, one option per line.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Io`] if writing fails.
    pub fn cleaners(mut self, cleaners: &[Cleaner]) -> Result<(), OutputError> {
        for cleaner in cleaners {
            write!(self.writer, "{}", cleaner.name.as_str().bold())?;
            if !cleaner.description.is_empty() {
                write!(self.writer, " - {}", cleaner.description)?;
            }
            writeln!(self.writer)?;
            if let Some(warning) = &cleaner.warning {
                writeln!(self.writer, "  {} {warning}", "warning:".yellow())?;
            }

            let width = cleaner
                .options
                .iter()
                .map(|o| cleaner.id.len() + o.id.len() + 1)
                .max()
                .unwrap_or(0);
            for option in &cleaner.options {
                let key = OptionKey::new(&cleaner.id, &option.id).to_string();
                write!(self.writer, "  {:<width$}  {}", key, option.label)?;
                if option.default_enabled {
                    write!(self.writer, " {}", "(default)".dim())?;
                }
                if option.warning.is_some() {
                    write!(self.writer, " {}", "(!)".yellow())?;
                }
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Every target a commit would touch, grouped by option.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Io`] if writing fails.
    pub fn preview(mut self, preview: &Preview) -> Result<(), OutputError> {
        let totals = preview.per_option();
        for (key, total) in &totals {
            self.option_header(key, total)?;
            for result in preview.results.iter().filter(|r| &r.option == key) {
                let size = if result.kind == TargetKind::FreeSpace {
                    format!("~{}", ByteSize::b(result.bytes))
                } else {
                    ByteSize::b(result.bytes).to_string()
                };
                writeln!(
                    self.writer,
                    "    {:<7} {:>10}  {}",
                    disposition_label(result.disposition).cyan(),
                    size,
                    result.target
                )?;
            }
            self.skips(key, &preview.skipped)?;
        }

        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} {} would be freed",
            "Estimate:".bold(),
            ByteSize::b(preview.estimated_bytes).green()
        )?;
        if preview.free_space_bytes > 0 {
            writeln!(
                self.writer,
                "{} about {} of free space would be overwritten",
                "Wipe:".bold(),
                ByteSize::b(preview.free_space_bytes)
            )?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Failures, per-option totals and a summary line.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Io`] if writing fails.
    pub fn report(mut self, report: &RunReport) -> Result<(), OutputError> {
        let failures: Vec<_> = report
            .outcomes
            .iter()
            .filter(|r| r.outcome.is_failed())
            .collect();
        if !failures.is_empty() {
            writeln!(self.writer, "{}", "Failed:".red().bold())?;
            for record in failures {
                if let RunOutcome::Failed(kind, message) = &record.outcome {
                    writeln!(
                        self.writer,
                        "  {} [{kind}] {}",
                        record.target,
                        message.as_str().dim()
                    )?;
                }
            }
            writeln!(self.writer)?;
        }

        let totals: BTreeMap<OptionKey, OptionTotals> = report.per_option();
        for (key, total) in &totals {
            write!(
                self.writer,
                "  {}: {} removed, {}",
                key.to_string().as_str().bold(),
                total.targets,
                ByteSize::b(total.bytes)
            )?;
            if total.skipped > 0 {
                write!(self.writer, ", {} skipped", total.skipped)?;
            }
            if total.failed > 0 {
                write!(self.writer, ", {}", format!("{} failed", total.failed).red())?;
            }
            writeln!(self.writer)?;
        }

        let summary = report.summary();
        if report.has_failures() || report.cancelled {
            writeln!(self.writer, "{}", summary.as_str().yellow())?;
        } else {
            writeln!(self.writer, "{}", summary.as_str().green())?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn option_header(&mut self, key: &OptionKey, total: &OptionTotals) -> Result<(), OutputError> {
        writeln!(
            self.writer,
            "{}  {} targets, {}",
            key.to_string().as_str().bold(),
            total.targets,
            ByteSize::b(total.bytes)
        )?;
        Ok(())
    }

    fn skips(&mut self, key: &OptionKey, skipped: &[SkipRecord]) -> Result<(), OutputError> {
        for skip in skipped.iter().filter(|s| &s.option == key) {
            writeln!(
                self.writer,
                "    {:<7} {:>10}  {} ({})",
                "skip".dim(),
                "",
                skip.subject,
                skip.reason
            )?;
        }
        Ok(())
    }
}

pub(crate) fn disposition_label(disposition: Disposition) -> &'static str {
    match disposition {
        Disposition::Execute => "run",
        Disposition::Wipe => "wipe",
        Disposition::Delete => "delete",
        Disposition::DeleteTree => "delete",
        Disposition::Shred => "shred",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineState, Selection};
    use crate::outcome::{FailureKind, OutcomeRecord, SkipReason};
    use crate::target::{MatchResult, TargetId};
    use chrono::Utc;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(TextOutput<&mut Vec<u8>>) -> Result<(), OutputError>,
    {
        yansi::disable();
        let mut buf = Vec::new();
        f(TextOutput::new(&mut buf)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn key() -> OptionKey {
        OptionKey::new("browser", "cache")
    }

    #[test]
    fn test_preview_lists_targets_and_estimate() {
        let preview = Preview {
            selection: Selection::default(),
            results: vec![MatchResult {
                option: key(),
                action_index: 0,
                target: TargetId::path("/home/u/cache/a.tmp"),
                kind: TargetKind::File,
                bytes: 2048,
                disposition: Disposition::Delete,
                root: None,
            }],
            skipped: vec![SkipRecord::new(key(), "/home/u/cache/keep", SkipReason::Excluded("whitelist".into()))],
            estimated_bytes: 2048,
            free_space_bytes: 0,
            generated_at: Utc::now(),
        };

        let out = render(|t| t.preview(&preview));
        assert!(out.contains("browser.cache"));
        assert!(out.contains("/home/u/cache/a.tmp"));
        assert!(out.contains("excluded: whitelist"));
        assert!(out.contains("would be freed"));
        assert!(!out.contains("Wipe:"));
    }

    #[test]
    fn test_report_shows_failures() {
        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            outcomes: vec![
                OutcomeRecord {
                    option: key(),
                    target: TargetId::path("/a"),
                    kind: TargetKind::File,
                    outcome: RunOutcome::Deleted(10),
                },
                OutcomeRecord {
                    option: key(),
                    target: TargetId::path("/b"),
                    kind: TargetKind::File,
                    outcome: RunOutcome::Failed(FailureKind::Permission, "denied".into()),
                },
            ],
            skipped: Vec::new(),
            state: EngineState::PartialFailure,
            cancelled: false,
        };

        let out = render(|t| t.report(&report));
        assert!(out.contains("Failed:"));
        assert!(out.contains("/b [permission] denied"));
        assert!(out.contains("1 removed, 0 skipped, 1 failed"));
    }

    #[test]
    fn test_cleaners_marks_defaults() {
        let cleaner = Cleaner::ad_hoc_shred(&[std::path::PathBuf::from("/tmp/x")]);
        let out = render(|t| t.cleaners(std::slice::from_ref(&cleaner)));
        assert!(out.contains("Shred"));
        assert!(out.contains("shred.paths"));
        assert!(out.contains("(default)"));
    }
}
