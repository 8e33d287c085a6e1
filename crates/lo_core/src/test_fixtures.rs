//! Shared test fixtures for lo_core and downstream crates.
//!
//! `base_catalog()` provides a small but complete catalog: one legendary per
//! bucket, artifice and exotic variants, a raid chest, the full stat-mod
//! catalog and a handful of bucket, combat and raid mods.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::catalog::{resolve_inventory, ItemsByBucket};
use crate::filter::Candidate;
use crate::{
    Bucket, Catalog, Constants, Item, ItemDef, ItemHash, ItemId, ModCategory, ModDef, ModHash,
    OwnedItem, SearchRequest, SocketCategory, Stat, StatConstraint, StatVector, BUCKET_COUNT,
};

pub const HELMET: ItemHash = ItemHash(1001);
pub const HELMET_ARTIFICE: ItemHash = ItemHash(1002);
pub const HELMET_EXOTIC: ItemHash = ItemHash(1003);
pub const GAUNTLETS: ItemHash = ItemHash(2001);
pub const GAUNTLETS_EXOTIC: ItemHash = ItemHash(2003);
pub const CHEST: ItemHash = ItemHash(3001);
pub const CHEST_RAID: ItemHash = ItemHash(3002);
pub const LEGS: ItemHash = ItemHash(4001);
pub const LEGS_ARTIFICE: ItemHash = ItemHash(4002);
pub const CLASS_ITEM: ItemHash = ItemHash(5001);

/// Plain legendary hash per bucket, in [`Bucket::ALL`] order.
pub const LEGENDARY: [ItemHash; BUCKET_COUNT] = [HELMET, GAUNTLETS, CHEST, LEGS, CLASS_ITEM];

pub const MOBILITY_MAJOR: ModHash = ModHash(100);
pub const RECOVERY_MINOR: ModHash = ModHash(112);
pub const HELMET_AMMO_FINDER: ModHash = ModHash(200);
pub const HELMET_TARGETING: ModHash = ModHash(201);
pub const CHARGE_A: ModHash = ModHash(300);
pub const CHARGE_B: ModHash = ModHash(301);
pub const RAID_MOD: ModHash = ModHash(400);

// Energy costs, indexed by stat.
const MAJOR_COST: [u8; 6] = [3, 3, 4, 3, 5, 3];
const MINOR_COST: [u8; 6] = [1, 1, 2, 1, 2, 1];

#[allow(clippy::cast_possible_truncation)]
pub fn major_mod(stat: Stat) -> ModHash {
    ModHash(100 + stat.index() as u32)
}

#[allow(clippy::cast_possible_truncation)]
pub fn minor_mod(stat: Stat) -> ModHash {
    ModHash(110 + stat.index() as u32)
}

#[allow(clippy::cast_possible_truncation)]
pub fn artifice_mod(stat: Stat) -> ModHash {
    ModHash(120 + stat.index() as u32)
}

fn item_def(
    hash: ItemHash,
    name: &str,
    bucket: Bucket,
    exotic: bool,
    extra: &[SocketCategory],
) -> ItemDef {
    let mut sockets = vec![
        SocketCategory::General,
        SocketCategory::BucketSpecific,
        SocketCategory::Combat,
    ];
    sockets.extend_from_slice(extra);
    ItemDef {
        hash,
        name: name.to_string(),
        bucket,
        exotic,
        sockets,
    }
}

fn special_mod(hash: ModHash, name: &str, category: ModCategory, energy_cost: u8) -> ModDef {
    ModDef {
        hash,
        name: name.to_string(),
        category,
        energy_cost,
        stats: StatVector::ZERO,
        exclusivity_group: None,
        auto_assignable: false,
    }
}

fn stat_mods() -> Vec<ModDef> {
    let mut mods = Vec::new();
    for stat in Stat::ALL {
        let i = stat.index();
        mods.push(ModDef {
            hash: major_mod(stat),
            name: format!("{} Mod", stat.label()),
            category: ModCategory::General,
            energy_cost: MAJOR_COST[i],
            stats: StatVector::from_pairs(&[(stat, 10)]),
            exclusivity_group: None,
            auto_assignable: true,
        });
        mods.push(ModDef {
            hash: minor_mod(stat),
            name: format!("Minor {} Mod", stat.label()),
            category: ModCategory::General,
            energy_cost: MINOR_COST[i],
            stats: StatVector::from_pairs(&[(stat, 5)]),
            exclusivity_group: None,
            auto_assignable: true,
        });
        mods.push(ModDef {
            hash: artifice_mod(stat),
            name: format!("Forged {} Mod", stat.label()),
            category: ModCategory::Artifice,
            energy_cost: 0,
            stats: StatVector::from_pairs(&[(stat, 3)]),
            exclusivity_group: None,
            auto_assignable: true,
        });
    }
    mods
}

pub fn base_catalog() -> Catalog {
    let items = vec![
        item_def(HELMET, "Legendary Helmet", Bucket::Helmet, false, &[]),
        item_def(
            HELMET_ARTIFICE,
            "Artifice Helmet",
            Bucket::Helmet,
            false,
            &[SocketCategory::Artifice],
        ),
        item_def(HELMET_EXOTIC, "Exotic Helmet", Bucket::Helmet, true, &[]),
        item_def(GAUNTLETS, "Legendary Gauntlets", Bucket::Gauntlets, false, &[]),
        item_def(GAUNTLETS_EXOTIC, "Exotic Gauntlets", Bucket::Gauntlets, true, &[]),
        item_def(CHEST, "Legendary Chest", Bucket::Chest, false, &[]),
        item_def(
            CHEST_RAID,
            "Raid Chest",
            Bucket::Chest,
            false,
            &[SocketCategory::Activity(1)],
        ),
        item_def(LEGS, "Legendary Legs", Bucket::Legs, false, &[]),
        item_def(
            LEGS_ARTIFICE,
            "Artifice Legs",
            Bucket::Legs,
            false,
            &[SocketCategory::Artifice],
        ),
        item_def(CLASS_ITEM, "Legendary Class Item", Bucket::ClassItem, false, &[]),
    ];

    let mut mods = stat_mods();
    mods.push(special_mod(
        HELMET_AMMO_FINDER,
        "Ammo Finder",
        ModCategory::BucketSpecific(Bucket::Helmet),
        3,
    ));
    mods.push(special_mod(
        HELMET_TARGETING,
        "Targeting",
        ModCategory::BucketSpecific(Bucket::Helmet),
        4,
    ));
    mods.push(ModDef {
        exclusivity_group: Some(1),
        ..special_mod(CHARGE_A, "Charged Up", ModCategory::Combat, 2)
    });
    mods.push(ModDef {
        exclusivity_group: Some(1),
        stats: StatVector::from_pairs(&[(Stat::Strength, -10)]),
        ..special_mod(CHARGE_B, "Stacks on Stacks", ModCategory::Combat, 1)
    });
    mods.push(special_mod(RAID_MOD, "Raid Resistance", ModCategory::Activity(1), 2));

    Catalog::new("test", items, mods, Constants::default())
}

/// An owned, non-masterworked item with full energy and no plugged mods.
pub fn owned(id: u64, hash: ItemHash, stats: StatVector) -> OwnedItem {
    OwnedItem {
        id: ItemId(id),
        hash,
        stats,
        energy_capacity: 10,
        masterworked: false,
        plugged: Vec::new(),
    }
}

/// One zero-stat legendary per bucket with the given energies. Ids are 1..=5.
pub fn standard_items(catalog: &Catalog, energies: [u8; BUCKET_COUNT]) -> [Item; BUCKET_COUNT] {
    Bucket::ALL.map(|bucket| {
        let i = bucket.index();
        let mut entry = owned(i as u64 + 1, LEGENDARY[i], StatVector::ZERO);
        entry.energy_capacity = energies[i];
        crate::catalog::resolve_item(catalog, &entry).expect("fixture item in catalog")
    })
}

/// Candidates over `items` using their real stats and energy.
pub fn candidate_set(items: &[Item; BUCKET_COUNT]) -> [Candidate<'_>; BUCKET_COUNT] {
    [0, 1, 2, 3, 4].map(|i| Candidate {
        item: &items[i],
        stats: items[i].base_stats,
        energy: items[i].energy_capacity,
    })
}

pub fn resolved(catalog: &Catalog, owned: &[OwnedItem]) -> ItemsByBucket {
    resolve_inventory(catalog, owned).items
}

/// Request with a minimum tier on each listed stat.
pub fn request_with_mins(mins: &[(Stat, u8)]) -> SearchRequest {
    let mut request = SearchRequest::default();
    for &(stat, min) in mins {
        request.constraints.insert(
            stat,
            StatConstraint {
                min,
                ..StatConstraint::default()
            },
        );
    }
    request
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
