use super::*;
use crate::test_fixtures::{self as fx, base_catalog, owned, request_with_mins};

mod auto;
mod cancellation;
mod exotics;

// --- Shared test helpers ------------------------------------------------

fn keep_all(_: &Item) -> bool {
    true
}

fn run(catalog: &Catalog, inventory: &[OwnedItem], request: &SearchRequest) -> SearchResult {
    let outcome =
        process(catalog, inventory, request, &keep_all, &Unmonitored).expect("valid input");
    let result = outcome.completed().expect("search was not cancelled");
    assert_counters_reconcile(&result.info);
    result
}

fn assert_counters_reconcile(info: &ProcessInfo) {
    assert_eq!(info.combos, info.evaluated + info.pruned, "{info:?}");
    assert_eq!(
        info.pruned,
        info.pruned_by_stat.iter().sum::<u64>() + info.pruned_by_exotic,
        "{info:?}"
    );
    assert_eq!(
        info.evaluated,
        info.emitted
            + info.rejected_exotic
            + info.rejected_exclusivity
            + info.rejected_assignment
            + info.rejected_by_stat.iter().sum::<u64>(),
        "{info:?}"
    );
    assert!(info.emitted >= info.best_effort);
}

/// One zero-stat legendary per bucket, ids 1..=5.
fn plain_inventory() -> Vec<OwnedItem> {
    fx::LEGENDARY
        .iter()
        .enumerate()
        .map(|(i, &hash)| owned(i as u64 + 1, hash, StatVector::ZERO))
        .collect()
}

/// Helmets with mobility 10/5/0, two gauntlets that add nothing to
/// mobility, and a single zero-stat item in every other bucket.
fn tier_scenario_inventory() -> Vec<OwnedItem> {
    vec![
        owned(1, fx::HELMET, StatVector([10, 0, 0, 0, 0, 0])),
        owned(2, fx::HELMET, StatVector([5, 0, 0, 0, 0, 0])),
        owned(3, fx::HELMET, StatVector::ZERO),
        owned(4, fx::GAUNTLETS, StatVector([0, 5, 5, 5, 0, 0])),
        owned(5, fx::GAUNTLETS, StatVector([0, 0, 10, 0, 0, 0])),
        owned(6, fx::CHEST, StatVector::ZERO),
        owned(7, fx::LEGS, StatVector::ZERO),
        owned(8, fx::CLASS_ITEM, StatVector::ZERO),
    ]
}

fn item_ids(set: &ResultSet) -> Vec<u64> {
    set.items.iter().map(|id| id.0).collect()
}
