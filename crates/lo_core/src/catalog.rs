//! Resolution of inventory items and locked mods against the read-only catalog.
//!
//! A hash absent from the catalog drops only the offending entry; the miss is
//! logged and returned so callers can surface it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{Bucket, Catalog, Item, ItemHash, ItemId, ModDef, ModHash, ModSocket, OwnedItem};

/// Raw item pools keyed by bucket.
pub type ItemsByBucket = BTreeMap<Bucket, Vec<Item>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupMiss {
    Item { item: ItemId, hash: ItemHash },
    Mod { hash: ModHash },
    /// Specific exotic lock on a hash the catalog lacks.
    ExoticLock { hash: ItemHash },
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedInventory {
    pub items: ItemsByBucket,
    pub misses: Vec<LookupMiss>,
}

pub fn resolve_item(catalog: &Catalog, owned: &OwnedItem) -> Option<Item> {
    let def = catalog.item(owned.hash)?;
    let sockets: SmallVec<[ModSocket; 6]> = def
        .sockets
        .iter()
        .enumerate()
        .map(|(i, &category)| ModSocket {
            category,
            plugged: owned.plugged.get(i).copied().flatten(),
        })
        .collect();
    Some(Item {
        id: owned.id,
        hash: owned.hash,
        name: def.name.clone(),
        bucket: def.bucket,
        exotic: def.exotic,
        base_stats: owned.stats,
        energy_capacity: owned.energy_capacity.min(catalog.constants.max_item_energy),
        masterworked: owned.masterworked,
        sockets,
    })
}

/// Groups owned items by bucket, dropping any whose definition is missing.
pub fn resolve_inventory(catalog: &Catalog, owned: &[OwnedItem]) -> ResolvedInventory {
    let mut resolved = ResolvedInventory::default();
    for bucket in Bucket::ALL {
        resolved.items.insert(bucket, Vec::new());
    }
    for entry in owned {
        match resolve_item(catalog, entry) {
            Some(item) => resolved.items.entry(item.bucket).or_default().push(item),
            None => {
                tracing::warn!(
                    item = %entry.id,
                    hash = %entry.hash,
                    "item definition not in catalog, dropping"
                );
                resolved.misses.push(LookupMiss::Item {
                    item: entry.id,
                    hash: entry.hash,
                });
            }
        }
    }
    resolved
}

/// Looks up locked mods, keeping request order. Missing hashes are skipped.
pub fn resolve_mods(catalog: &Catalog, hashes: &[ModHash]) -> (Vec<ModDef>, Vec<LookupMiss>) {
    let mut mods = Vec::with_capacity(hashes.len());
    let mut misses = Vec::new();
    for &hash in hashes {
        if let Some(def) = catalog.mod_def(hash) {
            mods.push(def.clone());
        } else {
            tracing::warn!(%hash, "locked mod not in catalog, ignoring");
            misses.push(LookupMiss::Mod { hash });
        }
    }
    (mods, misses)
}
