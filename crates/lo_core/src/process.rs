//! End-to-end pipeline: resolve, validate, filter, search, rank, diagnose.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::auto_mods::AutoModPicker;
use crate::catalog::{resolve_inventory, resolve_mods, LookupMiss};
use crate::filter::{filter_items, validate_request, FilterReason, FilterReport};
use crate::mod_assignment::{ExclusivityConflict, ModAssignmentChecker};
use crate::monitor::{SearchMonitor, SearchProgress};
use crate::ranking::StatEnvelope;
use crate::search::{elapsed_ms, search, ProcessInfo, SearchInput, SearchRun};
use crate::stats::{Stat, StatVector};
use crate::{
    Bucket, Catalog, ExoticLock, InputError, Item, ModHash, OwnedItem, ResultSet, SearchRequest,
};

/// Why a completed search produced no sets, naming what eliminated the most.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoResultsReason {
    /// A bucket had no candidates left; `reason` removed most of its items.
    EmptyBucket {
        bucket: Bucket,
        reason: Option<FilterReason>,
    },
    ModExclusivityConflict { conflict: ExclusivityConflict },
    ExoticRule,
    ModAssignment,
    StatMinimum { stat: Stat },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Ranked, best first, at most `result_limit` long.
    pub sets: Vec<ResultSet>,
    pub stat_ranges: StatEnvelope,
    pub info: ProcessInfo,
    pub filter_report: FilterReport,
    pub elapsed_ms: u64,
    /// Locked mods that took part in the search.
    pub locked_mods: Vec<ModHash>,
    /// Locked mod stats plus the subclass bonus, included in every set's stats.
    pub mod_stat_changes: StatVector,
    pub misses: Vec<LookupMiss>,
    pub no_results: Option<NoResultsReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Completed(Box<SearchResult>),
    Cancelled {
        elapsed_ms: u64,
        progress: SearchProgress,
    },
}

impl SearchOutcome {
    pub fn completed(self) -> Option<SearchResult> {
        match self {
            SearchOutcome::Completed(result) => Some(*result),
            SearchOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchOutcome::Cancelled { .. })
    }
}

fn diagnose(
    request: &SearchRequest,
    filter_report: &FilterReport,
    first_empty: Option<Bucket>,
    conflict: Option<ExclusivityConflict>,
    info: &ProcessInfo,
) -> Option<NoResultsReason> {
    if let Some(bucket) = first_empty {
        let reason = filter_report
            .bucket(bucket)
            .and_then(crate::filter::BucketFilterReport::dominant_reason);
        return Some(NoResultsReason::EmptyBucket { bucket, reason });
    }
    if let Some(conflict) = conflict {
        return Some(NoResultsReason::ModExclusivityConflict { conflict });
    }

    let mut best: Option<(NoResultsReason, u64)> = None;
    let mut consider = |reason: NoResultsReason, count: u64| {
        if count > 0 && best.as_ref().is_none_or(|&(_, c)| count > c) {
            best = Some((reason, count));
        }
    };
    for &stat in &request.stat_order {
        let i = stat.index();
        consider(
            NoResultsReason::StatMinimum { stat },
            info.pruned_by_stat[i] + info.rejected_by_stat[i],
        );
    }
    consider(
        NoResultsReason::ExoticRule,
        info.pruned_by_exotic + info.rejected_exotic,
    );
    consider(NoResultsReason::ModAssignment, info.rejected_assignment);
    best.map(|(reason, _)| reason)
}

/// Runs one optimization from raw inventory to ranked result.
///
/// Only malformed input is an error. Catalog misses drop the offending item
/// or mod and are listed in the result; cancellation is its own outcome.
pub fn process(
    catalog: &Catalog,
    inventory: &[OwnedItem],
    request: &SearchRequest,
    search_filter: &dyn Fn(&Item) -> bool,
    monitor: &dyn SearchMonitor,
) -> Result<SearchOutcome, InputError> {
    let span = tracing::info_span!("process", items = inventory.len());
    let _guard = span.enter();
    let start = Instant::now();

    let resolved = resolve_inventory(catalog, inventory);
    validate_request(&resolved.items, request)?;
    let (locked, mod_misses) = resolve_mods(catalog, &request.locked_mods);
    let mut misses = resolved.misses;
    misses.extend(mod_misses);
    if let ExoticLock::Specific(hash) = request.exotic_lock {
        if catalog.item(hash).is_none() {
            tracing::warn!(%hash, "locked exotic not in catalog, no item qualifies");
            misses.push(LookupMiss::ExoticLock { hash });
        }
    }

    let filtered = filter_items(catalog, &resolved.items, request, &locked, search_filter);
    if !filtered.report.unplaceable_mods.is_empty() {
        tracing::debug!(mods = ?filtered.report.unplaceable_mods, "locked mods no item can host");
    }

    let checker = ModAssignmentChecker::new(&filtered.mods);
    let picker = request
        .auto_stat_mods
        .then(|| AutoModPicker::new(catalog, &request.stat_order));
    let mod_stat_changes: StatVector =
        filtered.mods.iter().map(|m| m.stats).sum::<StatVector>() + request.subclass_stats;

    let input = SearchInput {
        pools: &filtered.pools,
        request,
        checker: &checker,
        picker: picker.as_ref(),
        offset: mod_stat_changes,
        result_limit: catalog.constants.result_limit,
    };
    let output = match search(&input, monitor) {
        SearchRun::Completed(output) => output,
        SearchRun::Cancelled(progress) => {
            tracing::info!(processed = progress.processed, "search cancelled");
            return Ok(SearchOutcome::Cancelled {
                elapsed_ms: elapsed_ms(start),
                progress,
            });
        }
    };

    let no_results = if output.sets.is_empty() {
        diagnose(
            request,
            &filtered.report,
            filtered.pools.first_empty(),
            checker.conflict(),
            &output.info,
        )
    } else {
        None
    };
    tracing::info!(
        combos = output.info.combos,
        emitted = output.info.emitted,
        returned = output.sets.len(),
        "search complete"
    );

    Ok(SearchOutcome::Completed(Box::new(SearchResult {
        sets: output.sets,
        stat_ranges: output.envelope,
        info: output.info,
        filter_report: filtered.report,
        elapsed_ms: elapsed_ms(start),
        locked_mods: filtered.mods.iter().map(|m| m.hash).collect(),
        mod_stat_changes,
        misses,
        no_results,
    })))
}
