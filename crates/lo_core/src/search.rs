//! Branch-and-bound enumeration of the five-slot cross product.
//!
//! Slots are expanded in [`crate::Bucket::ALL`] order. After each partial choice the
//! engine adds the suffix maximum of the unfilled slots (plus whatever
//! auto-assignment could still add) and prunes the subtree if any required
//! stat can no longer reach its minimum. Complete sets run through the exotic
//! rule, the locked-mod assignment check and the final stat check.
//!
//! First-slot subtrees run in parallel; their collectors are merged in slot
//! order so the outcome does not depend on scheduling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::auto_mods::AutoModPicker;
use crate::filter::{Candidate, CandidatePools};
use crate::mod_assignment::{AssignmentFailure, ModAssignmentChecker};
use crate::monitor::{SearchMonitor, SearchProgress};
use crate::ranking::{RankOrder, SetCollector, StatEnvelope};
use crate::stats::{Stat, StatVector, STAT_COUNT};
use crate::{
    ExoticLock, ModAssignment, ModHash, ResultSet, SearchRequest, SocketCategory, StatOutcome,
    BUCKET_COUNT,
};

const LAST: usize = BUCKET_COUNT - 1;
/// Minimum spacing between progress reports.
const PROGRESS_INTERVAL_MS: u64 = 100;

/// Combination counters. Every combination of the cross product is either
/// pruned before reaching a leaf or evaluated at one:
///
/// - `combos == evaluated + pruned`
/// - `pruned == sum(pruned_by_stat) + pruned_by_exotic`
/// - `evaluated == emitted + rejected_exotic + rejected_exclusivity
///   + rejected_assignment + sum(rejected_by_stat)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub combos: u64,
    pub evaluated: u64,
    pub pruned: u64,
    pub pruned_by_stat: [u64; STAT_COUNT],
    pub pruned_by_exotic: u64,
    /// Surviving sets, best-effort ones included.
    pub emitted: u64,
    pub best_effort: u64,
    pub rejected_exotic: u64,
    pub rejected_exclusivity: u64,
    pub rejected_assignment: u64,
    pub rejected_by_stat: [u64; STAT_COUNT],
}

impl ProcessInfo {
    /// Combinations accounted for, pruned or evaluated.
    pub fn processed(&self) -> u64 {
        self.evaluated + self.pruned
    }

    fn merge(&mut self, other: &ProcessInfo) {
        self.evaluated += other.evaluated;
        self.pruned += other.pruned;
        self.pruned_by_exotic += other.pruned_by_exotic;
        self.emitted += other.emitted;
        self.best_effort += other.best_effort;
        self.rejected_exotic += other.rejected_exotic;
        self.rejected_exclusivity += other.rejected_exclusivity;
        self.rejected_assignment += other.rejected_assignment;
        for i in 0..STAT_COUNT {
            self.pruned_by_stat[i] += other.pruned_by_stat[i];
            self.rejected_by_stat[i] += other.rejected_by_stat[i];
        }
    }
}

/// Everything one search needs. Borrowed, never mutated.
pub struct SearchInput<'a> {
    pub pools: &'a CandidatePools<'a>,
    pub request: &'a SearchRequest,
    pub checker: &'a ModAssignmentChecker,
    /// Present when auto stat mods are enabled.
    pub picker: Option<&'a AutoModPicker<'a>>,
    /// Locked mod stats plus the subclass bonus, added to every set.
    pub offset: StatVector,
    pub result_limit: usize,
}

#[derive(Debug, Clone)]
pub struct SearchOutput {
    pub sets: Vec<ResultSet>,
    pub envelope: StatEnvelope,
    pub info: ProcessInfo,
}

#[derive(Debug, Clone)]
pub enum SearchRun {
    Completed(Box<SearchOutput>),
    /// Halted at a checkpoint; nothing collected so far is returned.
    Cancelled(SearchProgress),
}

/// Per-search tables built once before enumeration.
struct Plan {
    /// `suffix_max[d]`: element-wise max of each slot `d..` summed.
    suffix_max: [StatVector; BUCKET_COUNT + 1],
    /// `suffix_count[d]`: number of leaves below a choice at depth `d - 1`.
    suffix_count: [u64; BUCKET_COUNT + 1],
    suffix_exotic: [bool; BUCKET_COUNT + 1],
    targets: [Option<i32>; STAT_COUNT],
    /// Required stats in priority order; pruning blames the first that fails.
    required: Vec<Stat>,
    auto_budget: StatVector,
    enabled: Vec<Stat>,
    order: RankOrder,
}

impl Plan {
    fn new(input: &SearchInput<'_>) -> Self {
        let mut suffix_max = [StatVector::ZERO; BUCKET_COUNT + 1];
        let mut suffix_count = [1u64; BUCKET_COUNT + 1];
        let mut suffix_exotic = [false; BUCKET_COUNT + 1];
        let (mut general, mut artifice) = (0, 0);
        for d in (0..BUCKET_COUNT).rev() {
            let pool = &input.pools.slots[d];
            let most = |category: SocketCategory| {
                pool.iter()
                    .map(|c| c.item.socket_count(category))
                    .max()
                    .unwrap_or(0)
            };
            general += most(SocketCategory::General);
            artifice += most(SocketCategory::Artifice);
            let slot_max = pool
                .iter()
                .fold(None, |acc: Option<StatVector>, c| {
                    Some(acc.map_or(c.stats, |m| m.max(&c.stats)))
                })
                .unwrap_or(StatVector::ZERO);
            suffix_max[d] = suffix_max[d + 1] + slot_max;
            suffix_count[d] = suffix_count[d + 1].saturating_mul(pool.len() as u64);
            suffix_exotic[d] = suffix_exotic[d + 1] || pool.iter().any(|c| c.item.exotic);
        }
        let targets = input.request.min_values();
        let required = input
            .request
            .stat_order
            .iter()
            .copied()
            .filter(|s| targets[s.index()].is_some())
            .collect();
        Plan {
            suffix_max,
            suffix_count,
            suffix_exotic,
            targets,
            required,
            auto_budget: input
                .picker
                .map_or(StatVector::ZERO, |p| p.budget(general, artifice)),
            enabled: input.request.enabled_stats().collect(),
            order: RankOrder::from_request(input.request),
        }
    }

    /// Points missing per required stat; zero elsewhere.
    fn deficit(&self, value: &StatVector) -> StatVector {
        let mut out = StatVector::ZERO;
        for &stat in &self.required {
            if let Some(target) = self.targets[stat.index()] {
                out[stat] = (target - value[stat]).max(0);
            }
        }
        out
    }

    /// First required stat, in priority order, that `value` leaves short.
    fn first_short(&self, value: &StatVector) -> Option<Stat> {
        self.required
            .iter()
            .copied()
            .find(|&s| self.targets[s.index()].is_some_and(|t| value[s] < t))
    }
}

/// Shared progress counter for all subtrees of one search.
struct Progress<'m> {
    start: Instant,
    combos: u64,
    processed: AtomicU64,
    last_report_ms: AtomicU64,
    monitor: &'m dyn SearchMonitor,
}

impl Progress<'_> {
    fn snapshot(&self) -> SearchProgress {
        SearchProgress {
            elapsed: self.start.elapsed(),
            combos: self.combos,
            processed: self.processed.load(Ordering::Relaxed),
        }
    }

    fn advance(&self, leaves: u64) {
        self.processed.fetch_add(leaves, Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)]
        let now = self.start.elapsed().as_millis() as u64;
        let last = self.last_report_ms.load(Ordering::Relaxed);
        if now >= last + PROGRESS_INTERVAL_MS
            && self
                .last_report_ms
                .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.monitor.report(&self.snapshot());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Cancelled,
}

enum Prune {
    Stat(Stat),
    Exotic,
}

/// One first-slot subtree: walks depths 1..=4 with its own counters.
struct Walk<'s, 'a> {
    input: &'s SearchInput<'a>,
    plan: &'s Plan,
    progress: &'s Progress<'s>,
    info: ProcessInfo,
    collector: SetCollector,
    chosen: [usize; BUCKET_COUNT],
}

impl<'s, 'a> Walk<'s, 'a> {
    fn prune(&self, depth: usize, partial: &StatVector, exotics: u8) -> Option<Prune> {
        if exotics > 1 {
            return Some(Prune::Exotic);
        }
        if self.input.request.exotic_lock == ExoticLock::AnyExotic
            && exotics == 0
            && !self.plan.suffix_exotic[depth + 1]
        {
            return Some(Prune::Exotic);
        }
        let bound =
            self.input.offset + *partial + self.plan.suffix_max[depth + 1] + self.plan.auto_budget;
        self.plan.first_short(&bound).map(Prune::Stat)
    }

    fn record_prune(&mut self, reason: &Prune, leaves: u64) {
        self.info.pruned += leaves;
        match *reason {
            Prune::Stat(stat) => self.info.pruned_by_stat[stat.index()] += leaves,
            Prune::Exotic => self.info.pruned_by_exotic += leaves,
        }
    }

    /// Handles the first-slot candidate `index`.
    fn root(&mut self, index: usize) -> Flow {
        let input = self.input;
        let candidate = &input.pools.slots[0][index];
        self.chosen[0] = index;
        let exotics = u8::from(candidate.item.exotic);
        if let Some(reason) = self.prune(0, &candidate.stats, exotics) {
            let leaves = self.plan.suffix_count[1];
            self.record_prune(&reason, leaves);
            self.progress.advance(leaves);
            return Flow::Continue;
        }
        self.descend(1, candidate.stats, exotics)
    }

    fn descend(&mut self, depth: usize, partial: StatVector, exotics: u8) -> Flow {
        let input = self.input;
        for (i, candidate) in input.pools.slots[depth].iter().enumerate() {
            if depth == 1 && self.progress.monitor.is_cancelled() {
                return Flow::Cancelled;
            }
            self.chosen[depth] = i;
            let next = partial + candidate.stats;
            let exotics = exotics + u8::from(candidate.item.exotic);

            if depth == LAST {
                self.evaluate(next, exotics);
                continue;
            }
            if let Some(reason) = self.prune(depth, &next, exotics) {
                self.record_prune(&reason, self.plan.suffix_count[depth + 1]);
            } else if self.descend(depth + 1, next, exotics) == Flow::Cancelled {
                return Flow::Cancelled;
            }
            if depth == 1 {
                self.progress.advance(self.plan.suffix_count[2]);
            }
        }
        Flow::Continue
    }

    fn set(&self) -> [Candidate<'a>; BUCKET_COUNT] {
        let pools = self.input.pools;
        [0, 1, 2, 3, 4].map(|d| pools.slots[d][self.chosen[d]])
    }

    fn evaluate(&mut self, partial: StatVector, exotics: u8) {
        self.info.evaluated += 1;
        let lock = self.input.request.exotic_lock;
        if exotics > 1 || (lock == ExoticLock::AnyExotic && exotics == 0) {
            self.info.rejected_exotic += 1;
            return;
        }

        let stats = self.input.offset + partial;
        let deficit = self.plan.deficit(&stats);
        if let Some(stat) = self
            .plan
            .first_short(&(stats + self.plan.auto_budget))
        {
            self.info.rejected_by_stat[stat.index()] += 1;
            return;
        }

        let set = self.set();
        let assignment = match self.input.checker.check(&set) {
            Ok(assignment) => assignment,
            Err(AssignmentFailure::Exclusivity(_)) => {
                self.info.rejected_exclusivity += 1;
                return;
            }
            Err(AssignmentFailure::NoFit) => {
                self.info.rejected_assignment += 1;
                return;
            }
        };

        self.info.emitted += 1;
        if deficit.is_zero() {
            let result = self.build(&set, stats, assignment, Vec::new(), None);
            self.collector.push(result);
            return;
        }
        // Only reachable with auto mods enabled: without a picker the budget
        // is zero and any deficit was rejected above.
        let picked = self
            .input
            .picker
            .and_then(|picker| picker.pick(&set, &deficit, self.input.checker));
        let result = match picked {
            Some(pick) => self.build(&set, stats + pick.added, pick.assignment, pick.mods, None),
            None => {
                self.info.best_effort += 1;
                self.build(&set, stats, assignment, Vec::new(), Some(deficit))
            }
        };
        self.collector.push(result);
    }

    fn build(
        &self,
        set: &[Candidate<'_>; BUCKET_COUNT],
        stats: StatVector,
        mods: ModAssignment,
        auto_mods: Vec<ModHash>,
        shortfall: Option<StatVector>,
    ) -> ResultSet {
        let request = self.input.request;
        let tiers = stats.tiers();
        let mut enabled_tier_total = 0u16;
        for &stat in &self.plan.enabled {
            enabled_tier_total += u16::from(self.plan.order.capped_tier_of(&tiers, stat));
        }
        let provenance = Stat::ALL.map(|stat| {
            let c = request.constraint(stat);
            let tier = tiers[stat.index()];
            if c.ignored {
                StatOutcome::Ignored
            } else if tier < c.min {
                StatOutcome::Short
            } else if tier > c.max {
                StatOutcome::Capped
            } else if c.min == 0 {
                StatOutcome::Unconstrained
            } else if tier == c.min {
                StatOutcome::Exact
            } else {
                StatOutcome::Exceeded
            }
        });
        let items = set.map(|c| c.item);
        ResultSet {
            items: items.map(|item| item.id),
            stats,
            tiers,
            enabled_tier_total,
            mod_swaps: mods.swaps(&items),
            mods,
            auto_mods,
            provenance,
            shortfall,
            half_tier_stats: stats.half_tier_stats(self.plan.enabled.iter().copied()),
        }
    }
}

/// Runs the search over already filtered pools.
///
/// An empty pool short-circuits to zero combinations without enumerating.
/// Cancellation is checked before every first- and second-slot subtree.
pub fn search(input: &SearchInput<'_>, monitor: &dyn SearchMonitor) -> SearchRun {
    let plan = Plan::new(input);
    let combos = input.pools.combos();
    let progress = Progress {
        start: Instant::now(),
        combos,
        processed: AtomicU64::new(0),
        last_report_ms: AtomicU64::new(0),
        monitor,
    };

    if let Some(bucket) = input.pools.first_empty() {
        tracing::debug!(%bucket, "empty candidate pool, nothing to enumerate");
        let (sets, envelope) = SetCollector::new(plan.order.clone(), input.result_limit).finish();
        return SearchRun::Completed(Box::new(SearchOutput {
            sets,
            envelope,
            info: ProcessInfo::default(),
        }));
    }

    let roots = input.pools.slots[0].len();
    let walks: Vec<Option<(ProcessInfo, SetCollector)>> = (0..roots)
        .into_par_iter()
        .map(|index| {
            if monitor.is_cancelled() {
                return None;
            }
            let mut walk = Walk {
                input,
                plan: &plan,
                progress: &progress,
                info: ProcessInfo::default(),
                collector: SetCollector::new(plan.order.clone(), input.result_limit),
                chosen: [0; BUCKET_COUNT],
            };
            match walk.root(index) {
                Flow::Continue => Some((walk.info, walk.collector)),
                Flow::Cancelled => None,
            }
        })
        .collect();

    if monitor.is_cancelled() || walks.iter().any(Option::is_none) {
        let snapshot = progress.snapshot();
        tracing::debug!(processed = snapshot.processed, combos, "search cancelled");
        return SearchRun::Cancelled(snapshot);
    }

    let mut info = ProcessInfo {
        combos,
        ..ProcessInfo::default()
    };
    let mut collector = SetCollector::new(plan.order.clone(), input.result_limit);
    for (walk_info, walk_collector) in walks.into_iter().flatten() {
        info.merge(&walk_info);
        collector.merge(walk_collector);
    }
    let (sets, envelope) = collector.finish();

    monitor.report(&SearchProgress {
        elapsed: progress.start.elapsed(),
        combos,
        processed: info.processed(),
    });
    tracing::debug!(
        combos,
        evaluated = info.evaluated,
        pruned = info.pruned,
        emitted = info.emitted,
        elapsed = ?progress.start.elapsed(),
        "search finished"
    );
    SearchRun::Completed(Box::new(SearchOutput {
        sets,
        envelope,
        info,
    }))
}

/// Wall time since `start`, in whole milliseconds.
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
