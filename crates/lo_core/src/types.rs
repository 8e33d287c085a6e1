//! Type definitions for `lo_core`.
//!
//! IDs, catalog definitions, owned/resolved items, the immutable search
//! request snapshot, and the result-set shape.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::stats::{Stat, StatVector, MAX_TIER, STAT_COUNT};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! numeric_id {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// Instance id of one owned item.
numeric_id!(ItemId, u64);
// Definition hash shared by every copy of the same item.
numeric_id!(ItemHash, u32);
numeric_id!(ModHash, u32);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

pub const BUCKET_COUNT: usize = 5;
/// Sockets per item the mod placement tracks; any beyond are never filled.
pub const MAX_ITEM_SOCKETS: usize = 16;
const _: () = assert!(MAX_ITEM_SOCKETS <= u16::BITS as usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Helmet,
    Gauntlets,
    Chest,
    Legs,
    ClassItem,
}

impl Bucket {
    /// Enumeration order of the search.
    pub const ALL: [Bucket; BUCKET_COUNT] = [
        Bucket::Helmet,
        Bucket::Gauntlets,
        Bucket::Chest,
        Bucket::Legs,
        Bucket::ClassItem,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Helmet => "helmet",
            Bucket::Gauntlets => "gauntlets",
            Bucket::Chest => "chest",
            Bucket::Legs => "legs",
            Bucket::ClassItem => "class item",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of mod socket on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketCategory {
    General,
    /// Accepts mods restricted to the item's own bucket.
    BucketSpecific,
    Combat,
    /// Raid/activity socket, identified by an activity tag.
    Activity(u32),
    Artifice,
}

/// Which sockets a mod can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModCategory {
    General,
    BucketSpecific(Bucket),
    Combat,
    Activity(u32),
    Artifice,
}

impl ModCategory {
    pub fn fits(self, socket: SocketCategory, bucket: Bucket) -> bool {
        match (self, socket) {
            (ModCategory::General, SocketCategory::General)
            | (ModCategory::Combat, SocketCategory::Combat)
            | (ModCategory::Artifice, SocketCategory::Artifice) => true,
            (ModCategory::BucketSpecific(wanted), SocketCategory::BucketSpecific) => {
                wanted == bucket
            }
            (ModCategory::Activity(a), SocketCategory::Activity(b)) => a == b,
            _ => false,
        }
    }

    pub fn bucket(self) -> Option<Bucket> {
        match self {
            ModCategory::BucketSpecific(bucket) => Some(bucket),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog (read-only definitions)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub hash: ItemHash,
    pub name: String,
    pub bucket: Bucket,
    #[serde(default)]
    pub exotic: bool,
    pub sockets: Vec<SocketCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModDef {
    pub hash: ModHash,
    pub name: String,
    pub category: ModCategory,
    pub energy_cost: u8,
    #[serde(default)]
    pub stats: StatVector,
    /// At most one mod per group may be active across a set.
    #[serde(default)]
    pub exclusivity_group: Option<u32>,
    /// Part of the stat-mod catalog the auto-assignment pass draws from.
    #[serde(default)]
    pub auto_assignable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub max_item_energy: u8,
    /// Added to every stat of a masterworked (or assumed-masterworked) item.
    pub masterwork_stat_bonus: i32,
    /// Number of ranked sets returned; counts still cover every survivor.
    pub result_limit: usize,
    /// Upper bound on auto-mod combinations tried per set.
    pub max_auto_mod_attempts: usize,
}

impl Default for Constants {
    fn default() -> Self {
        Constants {
            max_item_energy: 10,
            masterwork_stat_bonus: 2,
            result_limit: 200,
            max_auto_mod_attempts: 256,
        }
    }
}

/// Read-only dictionary from hashes to definitions, plus tuning constants.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub content_version: String,
    pub items: BTreeMap<ItemHash, ItemDef>,
    pub mods: BTreeMap<ModHash, ModDef>,
    pub constants: Constants,
}

impl Catalog {
    pub fn new(
        content_version: impl Into<String>,
        items: Vec<ItemDef>,
        mods: Vec<ModDef>,
        constants: Constants,
    ) -> Self {
        Catalog {
            content_version: content_version.into(),
            items: items.into_iter().map(|def| (def.hash, def)).collect(),
            mods: mods.into_iter().map(|def| (def.hash, def)).collect(),
            constants,
        }
    }

    pub fn item(&self, hash: ItemHash) -> Option<&ItemDef> {
        self.items.get(&hash)
    }

    pub fn mod_def(&self, hash: ModHash) -> Option<&ModDef> {
        self.mods.get(&hash)
    }

    pub fn auto_mods(&self) -> impl Iterator<Item = &ModDef> {
        self.mods.values().filter(|def| def.auto_assignable)
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// An item as it appears in the player's inventory, before catalog lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedItem {
    pub id: ItemId,
    pub hash: ItemHash,
    /// Rolled base stats, without any masterwork bonus.
    pub stats: StatVector,
    pub energy_capacity: u8,
    #[serde(default)]
    pub masterworked: bool,
    /// Currently plugged mods, parallel to the definition's sockets.
    #[serde(default)]
    pub plugged: Vec<Option<ModHash>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSocket {
    pub category: SocketCategory,
    pub plugged: Option<ModHash>,
}

/// A fully resolved item. Immutable for the duration of one search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub hash: ItemHash,
    pub name: String,
    pub bucket: Bucket,
    pub exotic: bool,
    pub base_stats: StatVector,
    pub energy_capacity: u8,
    pub masterworked: bool,
    pub sockets: SmallVec<[ModSocket; 6]>,
}

impl Item {
    pub fn is_artifice(&self) -> bool {
        self.sockets
            .iter()
            .any(|s| s.category == SocketCategory::Artifice)
    }

    pub fn socket_count(&self, category: SocketCategory) -> usize {
        self.sockets.iter().filter(|s| s.category == category).count()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssumeMasterwork {
    /// Use each item's real energy and stats.
    #[default]
    None,
    /// Treat every legendary as masterworked.
    Legendary,
    /// Treat every item, exotics included, as masterworked.
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorEnergyRules {
    #[serde(default)]
    pub assume_masterwork: AssumeMasterwork,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExoticLock {
    #[default]
    Unlocked,
    NoExotic,
    AnyExotic,
    Specific(ItemHash),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatConstraint {
    #[serde(default)]
    pub min: u8,
    #[serde(default = "default_max_tier")]
    pub max: u8,
    #[serde(default)]
    pub ignored: bool,
}

fn default_max_tier() -> u8 {
    MAX_TIER
}

impl Default for StatConstraint {
    fn default() -> Self {
        StatConstraint {
            min: 0,
            max: MAX_TIER,
            ignored: false,
        }
    }
}

fn default_stat_order() -> Vec<Stat> {
    Stat::ALL.to_vec()
}

/// Immutable input snapshot for one search invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Permutation of all stats, highest priority first.
    #[serde(default = "default_stat_order")]
    pub stat_order: Vec<Stat>,
    /// Missing entries mean "no minimum, max tier, not ignored".
    #[serde(default)]
    pub constraints: BTreeMap<Stat, StatConstraint>,
    #[serde(default)]
    pub pinned: BTreeMap<Bucket, ItemId>,
    #[serde(default)]
    pub excluded: BTreeSet<ItemId>,
    #[serde(default)]
    pub locked_mods: Vec<ModHash>,
    #[serde(default)]
    pub auto_stat_mods: bool,
    #[serde(default)]
    pub energy_rules: ArmorEnergyRules,
    #[serde(default)]
    pub exotic_lock: ExoticLock,
    /// Flat bonus from the equipped subclass, applied to every set.
    #[serde(default)]
    pub subclass_stats: StatVector,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            stat_order: default_stat_order(),
            constraints: BTreeMap::new(),
            pinned: BTreeMap::new(),
            excluded: BTreeSet::new(),
            locked_mods: Vec::new(),
            auto_stat_mods: false,
            energy_rules: ArmorEnergyRules::default(),
            exotic_lock: ExoticLock::default(),
            subclass_stats: StatVector::ZERO,
        }
    }
}

impl SearchRequest {
    pub fn constraint(&self, stat: Stat) -> StatConstraint {
        self.constraints.get(&stat).copied().unwrap_or_default()
    }

    /// Non-ignored stats, in priority order.
    pub fn enabled_stats(&self) -> impl Iterator<Item = Stat> + '_ {
        self.stat_order
            .iter()
            .copied()
            .filter(|&stat| !self.constraint(stat).ignored)
    }

    /// Hard lower bound per stat, `None` where the stat is ignored or has no minimum.
    pub fn min_values(&self) -> [Option<i32>; STAT_COUNT] {
        Stat::ALL.map(|stat| {
            let c = self.constraint(stat);
            (!c.ignored && c.min > 0).then(|| crate::stats::tier_floor(c.min))
        })
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedMod {
    /// Index into the item's socket list.
    pub socket: u8,
    pub hash: ModHash,
}

/// Concrete mod placement, one list per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModAssignment {
    pub slots: [SmallVec<[PlacedMod; 4]>; BUCKET_COUNT],
}

impl ModAssignment {
    pub fn mod_count(&self) -> usize {
        self.slots.iter().map(SmallVec::len).sum()
    }

    pub fn contains(&self, hash: ModHash) -> bool {
        self.slots.iter().flatten().any(|placed| placed.hash == hash)
    }

    /// Sockets whose plugged mod would have to change to apply this assignment.
    pub fn swaps(&self, items: &[&Item; BUCKET_COUNT]) -> u32 {
        let mut swaps = 0;
        for (slot, item) in self.slots.iter().zip(items.iter()) {
            for placed in slot {
                let current = item
                    .sockets
                    .get(usize::from(placed.socket))
                    .and_then(|s| s.plugged);
                if current != Some(placed.hash) {
                    swaps += 1;
                }
            }
        }
        swaps
    }
}

/// How a set's final value relates to the constraint on that stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatOutcome {
    Ignored,
    /// No minimum was requested.
    Unconstrained,
    /// Tier equals the requested minimum.
    Exact,
    /// Tier is above the minimum but within the maximum.
    Exceeded,
    /// Tier is above the requested maximum; the excess is not credited.
    Capped,
    /// Tier is below the minimum (best-effort results only).
    Short,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// One item per bucket, in [`Bucket::ALL`] order.
    pub items: [ItemId; BUCKET_COUNT],
    pub stats: StatVector,
    pub tiers: [u8; STAT_COUNT],
    /// Sum of enabled tiers, each capped at its constraint maximum.
    pub enabled_tier_total: u16,
    pub mods: ModAssignment,
    /// Mods picked by the auto-assignment pass, also present in `mods`.
    pub auto_mods: Vec<ModHash>,
    pub provenance: [StatOutcome; STAT_COUNT],
    /// Points still missing per stat when auto-assignment could not close the gap.
    pub shortfall: Option<StatVector>,
    pub mod_swaps: u32,
    pub half_tier_stats: Vec<Stat>,
}

impl ResultSet {
    pub fn is_best_effort(&self) -> bool {
        self.shortfall.is_some()
    }
}
