//! Result ranking, de-duplication and the achievable stat envelope.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::stats::{Stat, STAT_COUNT};
use crate::{ItemId, ResultSet, SearchRequest, BUCKET_COUNT};

/// Sorted item ids: the identity of a set regardless of enumeration order.
pub fn canonical_key(items: &[ItemId; BUCKET_COUNT]) -> [ItemId; BUCKET_COUNT] {
    let mut key = *items;
    key.sort_unstable();
    key
}

/// Enabled stats in priority order, with the tier cap credited for each.
#[derive(Debug, Clone)]
pub struct RankOrder {
    stats: SmallVec<[Stat; STAT_COUNT]>,
    caps: [u8; STAT_COUNT],
}

impl RankOrder {
    pub fn from_request(request: &SearchRequest) -> Self {
        RankOrder {
            stats: request.enabled_stats().collect(),
            caps: Stat::ALL.map(|stat| request.constraint(stat).max),
        }
    }

    pub fn stats(&self) -> &[Stat] {
        &self.stats
    }

    pub fn capped_tier(&self, set: &ResultSet, stat: Stat) -> u8 {
        self.capped_tier_of(&set.tiers, stat)
    }

    pub fn capped_tier_of(&self, tiers: &[u8; STAT_COUNT], stat: Stat) -> u8 {
        tiers[stat.index()].min(self.caps[stat.index()])
    }

    fn enabled_raw_total(&self, set: &ResultSet) -> i32 {
        self.stats.iter().map(|&stat| set.stats[stat]).sum()
    }
}

/// Total order over result sets, best first.
///
/// Best-effort sets sort after every fully satisfied one. Then higher capped
/// tier total, then capped tiers compared stat by stat in priority order,
/// then higher raw total over enabled stats, then the canonical item key.
pub fn compare_sets(order: &RankOrder, a: &ResultSet, b: &ResultSet) -> Ordering {
    a.is_best_effort()
        .cmp(&b.is_best_effort())
        .then(b.enabled_tier_total.cmp(&a.enabled_tier_total))
        .then_with(|| {
            order
                .stats
                .iter()
                .map(|&stat| order.capped_tier(b, stat).cmp(&order.capped_tier(a, stat)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| order.enabled_raw_total(b).cmp(&order.enabled_raw_total(a)))
        .then_with(|| canonical_key(&a.items).cmp(&canonical_key(&b.items)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRange {
    pub min_tier: u8,
    pub max_tier: u8,
}

/// Per-stat min/max tier over every fully satisfied surviving set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEnvelope {
    pub ranges: [Option<StatRange>; STAT_COUNT],
}

impl StatEnvelope {
    pub fn include(&mut self, tiers: &[u8; STAT_COUNT]) {
        for (range, &tier) in self.ranges.iter_mut().zip(tiers.iter()) {
            *range = Some(match *range {
                None => StatRange {
                    min_tier: tier,
                    max_tier: tier,
                },
                Some(r) => StatRange {
                    min_tier: r.min_tier.min(tier),
                    max_tier: r.max_tier.max(tier),
                },
            });
        }
    }

    pub fn merge(&mut self, other: &StatEnvelope) {
        for (range, other) in self.ranges.iter_mut().zip(other.ranges.iter()) {
            *range = match (*range, *other) {
                (None, x) | (x, None) => x,
                (Some(a), Some(b)) => Some(StatRange {
                    min_tier: a.min_tier.min(b.min_tier),
                    max_tier: a.max_tier.max(b.max_tier),
                }),
            };
        }
    }

    pub fn get(&self, stat: Stat) -> Option<StatRange> {
        self.ranges[stat.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(Option::is_none)
    }
}

/// Bounded accumulator of ranked sets.
///
/// Holds at most twice `limit` sets between compactions; the envelope is
/// updated on every push, so it covers sets that were later truncated away.
#[derive(Debug, Clone)]
pub struct SetCollector {
    order: RankOrder,
    limit: usize,
    sets: Vec<ResultSet>,
    envelope: StatEnvelope,
}

impl SetCollector {
    pub fn new(order: RankOrder, limit: usize) -> Self {
        SetCollector {
            order,
            limit,
            sets: Vec::new(),
            envelope: StatEnvelope::default(),
        }
    }

    pub fn push(&mut self, set: ResultSet) {
        if !set.is_best_effort() {
            self.envelope.include(&set.tiers);
        }
        self.sets.push(set);
        if self.sets.len() > self.limit.saturating_mul(2).max(1) {
            self.compact();
        }
    }

    /// Appends `other`'s sets. Merging in a fixed order keeps the outcome
    /// independent of how the search was split.
    pub fn merge(&mut self, other: SetCollector) {
        self.envelope.merge(&other.envelope);
        self.sets.extend(other.sets);
        if self.sets.len() > self.limit.saturating_mul(2).max(1) {
            self.compact();
        }
    }

    fn compact(&mut self) {
        let order = &self.order;
        self.sets.sort_by(|a, b| compare_sets(order, a, b));
        self.sets.dedup_by_key(|set| canonical_key(&set.items));
        self.sets.truncate(self.limit);
    }

    pub fn finish(mut self) -> (Vec<ResultSet>, StatEnvelope) {
        self.compact();
        (self.sets, self.envelope)
    }
}
