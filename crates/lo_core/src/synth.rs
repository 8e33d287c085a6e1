//! Seeded synthetic inventories for benchmarks and property tests.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::stats::{StatVector, STAT_COUNT};
use crate::{Bucket, Catalog, ItemDef, ItemId, OwnedItem};

/// Rolled stats come in two groups of three that each sum to roughly this.
const GROUP_TOTAL: i32 = 34;

fn roll_group(rng: &mut impl Rng) -> [i32; 3] {
    let a = rng.gen_range(2..=GROUP_TOTAL - 4);
    let b = rng.gen_range(2..=(GROUP_TOTAL - a - 2).max(2));
    [a, b, (GROUP_TOTAL - a - b).max(2)]
}

pub fn roll_stats(rng: &mut impl Rng) -> StatVector {
    let mut stats = [0; STAT_COUNT];
    let mut first = roll_group(rng);
    let mut second = roll_group(rng);
    first.shuffle(rng);
    second.shuffle(rng);
    stats[..3].copy_from_slice(&first);
    stats[3..].copy_from_slice(&second);
    StatVector(stats)
}

/// `per_bucket` random items for every bucket that has definitions in `catalog`.
///
/// Ids are assigned sequentially from 1. Roughly a third of the items come
/// masterworked; the rest have between 1 and full energy.
pub fn random_inventory(
    catalog: &Catalog,
    per_bucket: usize,
    rng: &mut impl Rng,
) -> Vec<OwnedItem> {
    let max_energy = catalog.constants.max_item_energy;
    let mut out = Vec::with_capacity(per_bucket * Bucket::ALL.len());
    let mut next_id = 1u64;
    for bucket in Bucket::ALL {
        let defs: Vec<&ItemDef> = catalog.items.values().filter(|d| d.bucket == bucket).collect();
        if defs.is_empty() {
            continue;
        }
        for _ in 0..per_bucket {
            let Some(def) = defs.choose(rng) else {
                continue;
            };
            let masterworked = rng.gen_bool(0.3);
            let energy_capacity = if masterworked {
                max_energy
            } else {
                rng.gen_range(1..=max_energy.max(1))
            };
            out.push(OwnedItem {
                id: ItemId(next_id),
                hash: def.hash,
                stats: roll_stats(rng),
                energy_capacity,
                masterworked,
                plugged: Vec::new(),
            });
            next_id += 1;
        }
    }
    out
}
