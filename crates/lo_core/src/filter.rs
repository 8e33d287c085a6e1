//! Candidate filtering: reduces each bucket's raw pool to the items the
//! search may use, and reports why the rest were removed.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::catalog::ItemsByBucket;
use crate::stats::{StatVector, MAX_TIER, STAT_COUNT};
use crate::{
    ArmorEnergyRules, AssumeMasterwork, Bucket, Catalog, Constants, ExoticLock, InputError, Item,
    ModCategory, ModDef, ModHash, SearchRequest, SocketCategory, BUCKET_COUNT,
};

impl ArmorEnergyRules {
    pub fn treats_as_masterworked(&self, item: &Item) -> bool {
        item.masterworked
            || match self.assume_masterwork {
                AssumeMasterwork::None => false,
                AssumeMasterwork::Legendary => !item.exotic,
                AssumeMasterwork::All => true,
            }
    }

    /// Energy capacity the search may spend on `item`.
    pub fn energy(&self, item: &Item, constants: &Constants) -> u8 {
        if self.treats_as_masterworked(item) {
            constants.max_item_energy
        } else {
            item.energy_capacity
        }
    }

    /// Stats `item` contributes to a set.
    pub fn stats(&self, item: &Item, constants: &Constants) -> StatVector {
        if self.treats_as_masterworked(item) {
            item.base_stats + StatVector::splat(constants.masterwork_stat_bonus)
        } else {
            item.base_stats
        }
    }
}

/// One feasible item with its stats and energy under the active energy rules.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub item: &'a Item,
    pub stats: StatVector,
    pub energy: u8,
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePools<'a> {
    /// Indexed by [`Bucket::index`].
    pub slots: [Vec<Candidate<'a>>; BUCKET_COUNT],
}

impl<'a> CandidatePools<'a> {
    pub fn get(&self, bucket: Bucket) -> &[Candidate<'a>] {
        &self.slots[bucket.index()]
    }

    pub fn sizes(&self) -> [usize; BUCKET_COUNT] {
        [0, 1, 2, 3, 4].map(|i| self.slots[i].len())
    }

    /// Size of the full cross product.
    pub fn combos(&self) -> u64 {
        self.slots
            .iter()
            .fold(1u64, |acc, slot| acc.saturating_mul(slot.len() as u64))
    }

    pub fn first_empty(&self) -> Option<Bucket> {
        Bucket::ALL
            .into_iter()
            .find(|&bucket| self.slots[bucket.index()].is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterReason {
    PinnedElsewhere,
    Excluded,
    WrongExotic,
    SearchFilter,
    NoModSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketFilterReport {
    pub bucket: Bucket,
    pub total: usize,
    pub kept: usize,
    pub pinned_elsewhere: usize,
    pub excluded: usize,
    pub wrong_exotic: usize,
    pub search_filter: usize,
    pub no_mod_slot: usize,
    /// The search predicate rejected every item, so it was ignored here.
    pub search_fallback: bool,
}

impl BucketFilterReport {
    fn new(bucket: Bucket, total: usize) -> Self {
        BucketFilterReport {
            bucket,
            total,
            kept: 0,
            pinned_elsewhere: 0,
            excluded: 0,
            wrong_exotic: 0,
            search_filter: 0,
            no_mod_slot: 0,
            search_fallback: false,
        }
    }

    pub fn removed(&self) -> usize {
        self.total - self.kept
    }

    /// The reason that removed the most items, if any were removed.
    pub fn dominant_reason(&self) -> Option<FilterReason> {
        [
            (FilterReason::PinnedElsewhere, self.pinned_elsewhere),
            (FilterReason::Excluded, self.excluded),
            (FilterReason::WrongExotic, self.wrong_exotic),
            (FilterReason::SearchFilter, self.search_filter),
            (FilterReason::NoModSlot, self.no_mod_slot),
        ]
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(reason, _)| reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub buckets: Vec<BucketFilterReport>,
    /// Locked mods no owned item could ever host; left out of the search.
    pub unplaceable_mods: Vec<ModHash>,
}

impl FilterReport {
    pub fn bucket(&self, bucket: Bucket) -> Option<&BucketFilterReport> {
        self.buckets.iter().find(|r| r.bucket == bucket)
    }
}

#[derive(Debug, Clone)]
pub struct FilterOutput<'a> {
    pub pools: CandidatePools<'a>,
    pub report: FilterReport,
    /// Locked mods that at least one owned item can host.
    pub mods: Vec<ModDef>,
}

/// Rejects malformed requests before any filtering happens.
pub fn validate_request(items: &ItemsByBucket, request: &SearchRequest) -> Result<(), InputError> {
    let order: AHashSet<_> = request.stat_order.iter().collect();
    if request.stat_order.len() != STAT_COUNT || order.len() != STAT_COUNT {
        return Err(InputError::InvalidStatOrder);
    }
    for (&stat, c) in &request.constraints {
        if c.max > MAX_TIER {
            return Err(InputError::TierOutOfRange { stat, tier: c.max });
        }
        if c.min > c.max {
            return Err(InputError::InvertedConstraint {
                stat,
                min: c.min,
                max: c.max,
            });
        }
    }

    let mut seen = AHashSet::new();
    for (&listed, pool) in items {
        for item in pool {
            if item.bucket != listed {
                return Err(InputError::MisplacedItem {
                    item: item.id,
                    listed,
                    actual: item.bucket,
                });
            }
            if !seen.insert(item.id) {
                return Err(InputError::DuplicateItem(item.id));
            }
        }
    }

    for (&bucket, &pinned) in &request.pinned {
        if request.excluded.contains(&pinned) {
            return Err(InputError::PinnedAndExcluded(pinned));
        }
        let present = items
            .get(&bucket)
            .is_some_and(|pool| pool.iter().any(|item| item.id == pinned));
        if !present {
            return Err(InputError::PinnedItemMissing {
                bucket,
                item: pinned,
            });
        }
    }
    Ok(())
}

/// Splits locked mods into those some owned item could host and those none can.
pub fn partition_placeable(mods: &[ModDef], items: &ItemsByBucket) -> (Vec<ModDef>, Vec<ModHash>) {
    let mut placeable = Vec::with_capacity(mods.len());
    let mut unplaceable = Vec::new();
    for def in mods {
        let hostable = items.values().flatten().any(|item| {
            item.sockets
                .iter()
                .any(|socket| def.category.fits(socket.category, item.bucket))
        });
        if hostable {
            placeable.push(def.clone());
        } else {
            unplaceable.push(def.hash);
        }
    }
    (placeable, unplaceable)
}

fn exotic_allowed(item: &Item, lock: ExoticLock, locked_bucket: Option<Bucket>) -> bool {
    match lock {
        ExoticLock::Unlocked | ExoticLock::AnyExotic => true,
        ExoticLock::NoExotic => !item.exotic,
        ExoticLock::Specific(hash) => {
            // A lock on an exotic the catalog lacks admits nothing.
            let Some(locked) = locked_bucket else {
                return false;
            };
            if item.hash == hash {
                return true;
            }
            // The locked exotic's bucket holds nothing else, and no other exotic anywhere.
            !item.exotic && locked != item.bucket
        }
    }
}

/// Whether `item` could host every bucket-specific locked mod for its bucket.
fn hosts_bucket_mods(item: &Item, energy: u8, bucket_mods: &[&ModDef]) -> bool {
    if bucket_mods.is_empty() {
        return true;
    }
    let cost: u32 = bucket_mods.iter().map(|m| u32::from(m.energy_cost)).sum();
    item.socket_count(SocketCategory::BucketSpecific) >= bucket_mods.len()
        && cost <= u32::from(energy)
}

/// Builds the per-bucket candidate lists.
///
/// A pinned item is the only candidate for its bucket and bypasses every
/// other filter. Candidates are ordered by total stats, descending, then id.
pub fn filter_items<'a>(
    catalog: &Catalog,
    items: &'a ItemsByBucket,
    request: &SearchRequest,
    locked_mods: &[ModDef],
    search_filter: &dyn Fn(&Item) -> bool,
) -> FilterOutput<'a> {
    let constants = &catalog.constants;
    let rules = request.energy_rules;
    let locked_bucket = match request.exotic_lock {
        ExoticLock::Specific(hash) => catalog.item(hash).map(|def| def.bucket),
        _ => None,
    };
    let (mods, unplaceable_mods) = partition_placeable(locked_mods, items);

    let mut pools = CandidatePools::default();
    let mut report = FilterReport {
        buckets: Vec::with_capacity(BUCKET_COUNT),
        unplaceable_mods,
    };

    for bucket in Bucket::ALL {
        let pool: &[Item] = items.get(&bucket).map_or(&[], Vec::as_slice);
        let mut bucket_report = BucketFilterReport::new(bucket, pool.len());
        let bucket_mods: Vec<&ModDef> = mods
            .iter()
            .filter(|m| m.category == ModCategory::BucketSpecific(bucket))
            .collect();

        let mut kept: Vec<&Item> = Vec::with_capacity(pool.len());
        if let Some(&pinned) = request.pinned.get(&bucket) {
            for item in pool {
                if item.id == pinned {
                    kept.push(item);
                } else {
                    bucket_report.pinned_elsewhere += 1;
                }
            }
        } else {
            let mut first_pass = Vec::with_capacity(pool.len());
            for item in pool {
                if request.excluded.contains(&item.id) {
                    bucket_report.excluded += 1;
                } else if !exotic_allowed(item, request.exotic_lock, locked_bucket) {
                    bucket_report.wrong_exotic += 1;
                } else if !hosts_bucket_mods(item, rules.energy(item, constants), &bucket_mods) {
                    bucket_report.no_mod_slot += 1;
                } else {
                    first_pass.push(item);
                }
            }
            let searched: Vec<&Item> = first_pass
                .iter()
                .copied()
                .filter(|item| search_filter(item))
                .collect();
            if searched.is_empty() && !first_pass.is_empty() {
                bucket_report.search_fallback = true;
                kept = first_pass;
            } else {
                bucket_report.search_filter = first_pass.len() - searched.len();
                kept = searched;
            }
        }

        let mut candidates: Vec<Candidate<'a>> = kept
            .into_iter()
            .map(|item| Candidate {
                item,
                stats: rules.stats(item, constants),
                energy: rules.energy(item, constants),
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.stats
                .total()
                .cmp(&a.stats.total())
                .then(a.item.id.cmp(&b.item.id))
        });

        bucket_report.kept = candidates.len();
        pools.slots[bucket.index()] = candidates;
        report.buckets.push(bucket_report);
    }

    tracing::debug!(sizes = ?pools.sizes(), combos = pools.combos(), "filtered candidate pools");
    FilterOutput {
        pools,
        report,
        mods,
    }
}
