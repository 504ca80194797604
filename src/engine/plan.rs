//! Commit planning.
//!
//! A [`CommitPlan`] turns the results of a preview into the sequence commit
//! executes. Targets claimed by more than one option are merged into one
//! item carrying the strongest disposition, and path targets are ordered
//! contents-first: no item runs after a directory above it.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::outcome::{OutcomeRecord, RunOutcome, SkipReason};
use crate::target::{Disposition, MatchResult, TargetId};

/// Ordered, de-duplicated commit work.
#[derive(Debug, Clone, Default)]
pub struct CommitPlan {
    items: Vec<MatchResult>,
    duplicates: Vec<OutcomeRecord>,
}

impl CommitPlan {
    /// Build a plan from results in preview order.
    #[must_use]
    pub fn build(results: Vec<MatchResult>) -> Self {
        let mut items: Vec<MatchResult> = Vec::with_capacity(results.len());
        let mut duplicates = Vec::new();
        let mut seen: HashMap<TargetId, usize> = HashMap::new();

        for result in results {
            if let Some(&index) = seen.get(&result.target) {
                let kept = &mut items[index];
                if result.disposition > kept.disposition {
                    log::debug!(
                        "{} upgraded from {:?} to {:?} by {}",
                        kept.target,
                        kept.disposition,
                        result.disposition,
                        result.option
                    );
                    kept.disposition = result.disposition;
                }
                duplicates.push(OutcomeRecord {
                    option: result.option,
                    target: result.target,
                    kind: result.kind,
                    outcome: RunOutcome::Skipped(SkipReason::DuplicateTarget),
                });
                continue;
            }
            seen.insert(result.target.clone(), items.len());
            items.push(result);
        }

        Self {
            items: order_contents_first(items),
            duplicates,
        }
    }

    /// Items in execution order.
    #[must_use]
    pub fn items(&self) -> &[MatchResult] {
        &self.items
    }

    /// Consume the plan, returning the items in execution order.
    #[must_use]
    pub fn into_items(self) -> Vec<MatchResult> {
        self.items
    }

    /// Records for targets merged into an earlier item.
    #[must_use]
    pub fn duplicates(&self) -> &[OutcomeRecord] {
        &self.duplicates
    }

    /// Number of items to execute.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Estimated bytes freed, excluding free space wipes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.items
            .iter()
            .filter(|item| item.disposition != Disposition::Wipe)
            .map(|item| item.bytes)
            .sum()
    }

    /// Bytes free space wipes would write.
    #[must_use]
    pub fn wipe_bytes(&self) -> u64 {
        self.items
            .iter()
            .filter(|item| item.disposition == Disposition::Wipe)
            .map(|item| item.bytes)
            .sum()
    }
}

/// Stable reorder so every path runs before all of its ancestors.
///
/// An ancestor is moved to the position of its last descendant; ties are
/// broken deepest first, then by original position.
fn order_contents_first(items: Vec<MatchResult>) -> Vec<MatchResult> {
    let positions: HashMap<PathBuf, usize> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| item.target.as_path().map(|p| (p.to_path_buf(), i)))
        .collect();

    let mut last_descendant: Vec<usize> = (0..items.len()).collect();
    for (i, item) in items.iter().enumerate() {
        let Some(path) = item.target.as_path() else {
            continue;
        };
        for ancestor in path.ancestors().skip(1) {
            if let Some(&a) = positions.get(ancestor) {
                last_descendant[a] = last_descendant[a].max(i);
            }
        }
    }

    let mut keyed: Vec<(usize, Reverse<usize>, usize, MatchResult)> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| (last_descendant[i], Reverse(item.depth()), i, item))
        .collect();
    keyed.sort_by_key(|(slot, depth, i, _)| (*slot, *depth, *i));
    keyed.into_iter().map(|(_, _, _, item)| item).collect()
}
