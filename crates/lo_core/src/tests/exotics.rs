use super::*;

/// Legendary plus exotic in helmet and gauntlets, one legendary elsewhere.
fn exotic_inventory() -> Vec<OwnedItem> {
    let mut inventory = plain_inventory();
    inventory.push(owned(11, fx::HELMET_EXOTIC, StatVector([20, 0, 0, 0, 0, 0])));
    inventory.push(owned(12, fx::GAUNTLETS_EXOTIC, StatVector([0, 20, 0, 0, 0, 0])));
    inventory
}

fn exotic_count(set: &ResultSet) -> usize {
    set.items.iter().filter(|id| id.0 > 10).count()
}

#[test]
fn never_more_than_one_exotic() {
    let catalog = base_catalog();
    let result = run(&catalog, &exotic_inventory(), &SearchRequest::default());
    assert_eq!(result.info.combos, 4);
    assert_eq!(result.info.pruned_by_exotic, 1);
    assert_eq!(result.sets.len(), 3);
    assert!(result.sets.iter().all(|s| exotic_count(s) <= 1));
}

#[test]
fn any_exotic_requires_exactly_one() {
    let catalog = base_catalog();
    let request = SearchRequest {
        exotic_lock: ExoticLock::AnyExotic,
        ..SearchRequest::default()
    };
    let result = run(&catalog, &exotic_inventory(), &request);
    assert_eq!(result.sets.len(), 2);
    assert!(result.sets.iter().all(|s| exotic_count(s) == 1));
    // Legendary helmet + legendary gauntlets has no exotic left to add.
    assert_eq!(result.info.pruned_by_exotic, 2);
}

#[test]
fn specific_exotic_lock_forces_that_item() {
    let catalog = base_catalog();
    let request = SearchRequest {
        exotic_lock: ExoticLock::Specific(fx::GAUNTLETS_EXOTIC),
        ..SearchRequest::default()
    };
    let result = run(&catalog, &exotic_inventory(), &request);
    assert_eq!(result.sets.len(), 1);
    assert_eq!(item_ids(&result.sets[0]), vec![1, 12, 3, 4, 5]);
}

#[test]
fn no_exotic_lock_uses_legendaries_only() {
    let catalog = base_catalog();
    let request = SearchRequest {
        exotic_lock: ExoticLock::NoExotic,
        ..SearchRequest::default()
    };
    let result = run(&catalog, &exotic_inventory(), &request);
    assert_eq!(result.info.combos, 1);
    assert_eq!(item_ids(&result.sets[0]), vec![1, 2, 3, 4, 5]);
}

#[test]
fn any_exotic_without_exotics_explains_itself() {
    let catalog = base_catalog();
    let request = SearchRequest {
        exotic_lock: ExoticLock::AnyExotic,
        ..SearchRequest::default()
    };
    let result = run(&catalog, &plain_inventory(), &request);
    assert!(result.sets.is_empty());
    assert_eq!(result.no_results, Some(NoResultsReason::ExoticRule));
}

#[test]
fn unknown_specific_exotic_finds_nothing() {
    let catalog = base_catalog();
    let hash = ItemHash(777_777);
    let request = SearchRequest {
        exotic_lock: ExoticLock::Specific(hash),
        ..SearchRequest::default()
    };
    let result = run(&catalog, &plain_inventory(), &request);

    assert!(result.sets.is_empty());
    assert_eq!(result.info.combos, 0);
    assert!(result.misses.contains(&LookupMiss::ExoticLock { hash }));
    assert_eq!(
        result.no_results,
        Some(NoResultsReason::EmptyBucket {
            bucket: Bucket::Helmet,
            reason: Some(FilterReason::WrongExotic),
        })
    );
}
