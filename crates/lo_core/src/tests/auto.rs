use super::*;

fn mobility_helmet_inventory(energy: u8) -> Vec<OwnedItem> {
    let mut inventory = plain_inventory();
    inventory[0].stats = StatVector::from_pairs(&[(Stat::Mobility, 5)]);
    for item in &mut inventory {
        item.energy_capacity = energy;
    }
    inventory
}

fn auto_request(min_mobility: u8) -> SearchRequest {
    SearchRequest {
        auto_stat_mods: true,
        ..request_with_mins(&[(Stat::Mobility, min_mobility)])
    }
}

#[test]
fn auto_mods_close_the_gap() {
    let catalog = base_catalog();
    let result = run(&catalog, &mobility_helmet_inventory(10), &auto_request(2));

    assert_eq!(result.sets.len(), 1);
    let set = &result.sets[0];
    assert!(!set.is_best_effort());
    assert_eq!(
        set.auto_mods,
        vec![fx::major_mod(Stat::Mobility), fx::minor_mod(Stat::Mobility)]
    );
    assert_eq!(set.stats[Stat::Mobility], 20);
    assert_eq!(set.provenance[Stat::Mobility.index()], StatOutcome::Exact);
    assert_eq!(set.mods.mod_count(), 2);
    assert_eq!(
        result.stat_ranges.get(Stat::Mobility),
        Some(StatRange {
            min_tier: 2,
            max_tier: 2
        })
    );
}

#[test]
fn without_auto_mods_the_set_is_pruned() {
    let catalog = base_catalog();
    let request = SearchRequest {
        auto_stat_mods: false,
        ..auto_request(2)
    };
    let result = run(&catalog, &mobility_helmet_inventory(10), &request);
    assert!(result.sets.is_empty());
    assert_eq!(result.info.pruned_by_stat[Stat::Mobility.index()], 1);
}

#[test]
fn unfittable_auto_mods_demote_to_best_effort() {
    let catalog = base_catalog();
    let result = run(&catalog, &mobility_helmet_inventory(0), &auto_request(2));

    assert_eq!(result.sets.len(), 1);
    assert_eq!(result.info.best_effort, 1);
    let set = &result.sets[0];
    assert_eq!(
        set.shortfall,
        Some(StatVector::from_pairs(&[(Stat::Mobility, 15)]))
    );
    assert_eq!(set.provenance[Stat::Mobility.index()], StatOutcome::Short);
    assert!(set.auto_mods.is_empty());
    // Best-effort sets stay out of the envelope.
    assert!(result.stat_ranges.is_empty());
    assert!(result.no_results.is_none());
}

#[test]
fn deficits_beyond_the_auto_budget_are_pruned() {
    let catalog = base_catalog();
    let result = run(&catalog, &mobility_helmet_inventory(10), &auto_request(10));
    assert!(result.sets.is_empty());
    assert_eq!(result.info.pruned_by_stat[Stat::Mobility.index()], 1);
    assert_eq!(
        result.no_results,
        Some(NoResultsReason::StatMinimum {
            stat: Stat::Mobility
        })
    );
}

#[test]
fn fitting_sets_rank_above_best_effort_ones() {
    let catalog = base_catalog();
    let mut inventory = mobility_helmet_inventory(0);
    inventory[0].stats = StatVector::from_pairs(&[(Stat::Mobility, 10)]);
    inventory[0].energy_capacity = 10;
    // Far higher totals, but no energy to host the missing mobility.
    inventory.push(owned(9, fx::HELMET, StatVector([9, 50, 50, 0, 0, 0])));
    inventory[5].energy_capacity = 0;

    let result = run(&catalog, &inventory, &auto_request(2));
    assert_eq!(result.sets.len(), 2);
    assert!(!result.sets[0].is_best_effort());
    assert_eq!(result.sets[0].items[0], ItemId(1));
    assert!(result.sets[1].is_best_effort());
    assert_eq!(result.sets[1].items[0], ItemId(9));
}

#[test]
fn second_general_socket_raises_the_auto_budget() {
    let mut catalog = base_catalog();
    for def in catalog.items.values_mut() {
        def.sockets.push(SocketCategory::General);
    }
    // 65 missing points need seven general mods, more than one per item.
    let result = run(&catalog, &mobility_helmet_inventory(10), &auto_request(7));

    assert_eq!(result.sets.len(), 1);
    let set = &result.sets[0];
    assert!(!set.is_best_effort());
    assert_eq!(set.auto_mods.len(), 7);
    assert!(set.stats[Stat::Mobility] >= 70);
    assert_eq!(result.info.pruned, 0);
    assert!(result.no_results.is_none());
}
