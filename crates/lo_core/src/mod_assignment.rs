//! Mod-to-item assignment feasibility.
//!
//! Given a fixed five-item set and a list of mods, decide whether every mod
//! can sit in a compatible free socket without exceeding its item's energy,
//! and if so produce one concrete placement. Infeasibility is an ordinary
//! return value: callers prune the set, nothing is raised.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::filter::Candidate;
use crate::{
    ModAssignment, ModDef, ModHash, PlacedMod, SocketCategory, BUCKET_COUNT, MAX_ITEM_SOCKETS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusivityConflict {
    pub group: u32,
    pub first: ModHash,
    pub second: ModHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentFailure {
    /// Two mods from the same exclusivity group; no set can ever host both.
    Exclusivity(ExclusivityConflict),
    /// Not enough compatible sockets or energy on this set.
    NoFit,
}

/// Placement order: bucket-restricted mods first (each has exactly one
/// possible item), then the most expensive, then by hash for determinism.
fn placement_order(a: &ModDef, b: &ModDef) -> std::cmp::Ordering {
    b.category
        .bucket()
        .is_some()
        .cmp(&a.category.bucket().is_some())
        .then(b.energy_cost.cmp(&a.energy_cost))
        .then(a.hash.cmp(&b.hash))
}

fn find_conflict<'m>(mods: impl IntoIterator<Item = &'m ModDef>) -> Option<ExclusivityConflict> {
    let mut seen: AHashMap<u32, ModHash> = AHashMap::new();
    for def in mods {
        let Some(group) = def.exclusivity_group else {
            continue;
        };
        if let Some(&first) = seen.get(&group) {
            return Some(ExclusivityConflict {
                group,
                first,
                second: def.hash,
            });
        }
        seen.insert(group, def.hash);
    }
    None
}

#[derive(Debug, Clone, Copy)]
struct SlotState {
    remaining: i16,
    /// Bitmask of occupied socket indices below [`MAX_ITEM_SOCKETS`].
    used: u16,
}

struct Placement<'s, 'a> {
    set: &'s [Candidate<'a>; BUCKET_COUNT],
    state: [SlotState; BUCKET_COUNT],
    placed: [SmallVec<[PlacedMod; 4]>; BUCKET_COUNT],
}

impl Placement<'_, '_> {
    fn free_socket(&self, slot: usize, def: &ModDef) -> Option<usize> {
        let item = self.set[slot].item;
        item.sockets.iter().take(MAX_ITEM_SOCKETS).enumerate().position(|(i, socket)| {
            self.state[slot].used & (1 << i) == 0 && def.category.fits(socket.category, item.bucket)
        })
    }

    /// Remaining energy plus free socket kinds, ignoring bucket-specific
    /// sockets (those mods are all placed before anything else). Two slots
    /// with equal signatures are interchangeable for the rest of the search.
    fn signature(&self, slot: usize) -> (i16, SmallVec<[SocketCategory; 6]>) {
        let item = self.set[slot].item;
        let free = item
            .sockets
            .iter()
            .take(MAX_ITEM_SOCKETS)
            .enumerate()
            .filter(|&(i, s)| {
                self.state[slot].used & (1 << i) == 0
                    && s.category != SocketCategory::BucketSpecific
            })
            .map(|(_, s)| s.category)
            .collect();
        (self.state[slot].remaining, free)
    }

    fn place(&mut self, mods: &[&ModDef]) -> bool {
        let Some((&def, rest)) = mods.split_first() else {
            return true;
        };
        let cost = i16::from(def.energy_cost);
        let targets: SmallVec<[usize; BUCKET_COUNT]> = match def.category.bucket() {
            Some(bucket) => smallvec::smallvec![bucket.index()],
            None => (0..BUCKET_COUNT).collect(),
        };

        let mut tried: SmallVec<[(i16, SmallVec<[SocketCategory; 6]>); BUCKET_COUNT]> =
            SmallVec::new();
        for slot in targets {
            if self.state[slot].remaining < cost {
                continue;
            }
            let Some(socket) = self.free_socket(slot, def) else {
                continue;
            };
            if def.category.bucket().is_none() {
                let signature = self.signature(slot);
                if tried.contains(&signature) {
                    continue;
                }
                tried.push(signature);
            }

            self.state[slot].remaining -= cost;
            self.state[slot].used |= 1 << socket;
            #[allow(clippy::cast_possible_truncation)]
            self.placed[slot].push(PlacedMod {
                socket: socket as u8,
                hash: def.hash,
            });

            if self.place(rest) {
                return true;
            }

            self.placed[slot].pop();
            self.state[slot].used &= !(1 << socket);
            self.state[slot].remaining += cost;
        }
        false
    }
}

/// Checks a fixed list of locked mods against candidate sets.
///
/// Sorting and the exclusivity check happen once in [`ModAssignmentChecker::new`];
/// each [`check`](ModAssignmentChecker::check) is a bounded backtracking
/// placement over at most five items.
#[derive(Debug, Clone)]
pub struct ModAssignmentChecker {
    mods: Vec<ModDef>,
    conflict: Option<ExclusivityConflict>,
}

impl ModAssignmentChecker {
    pub fn new(mods: &[ModDef]) -> Self {
        let mut mods = mods.to_vec();
        mods.sort_by(placement_order);
        let conflict = find_conflict(&mods);
        ModAssignmentChecker { mods, conflict }
    }

    pub fn mods(&self) -> &[ModDef] {
        &self.mods
    }

    pub fn conflict(&self) -> Option<ExclusivityConflict> {
        self.conflict
    }

    pub fn check(
        &self,
        set: &[Candidate<'_>; BUCKET_COUNT],
    ) -> Result<ModAssignment, AssignmentFailure> {
        if let Some(conflict) = self.conflict {
            return Err(AssignmentFailure::Exclusivity(conflict));
        }
        let mods: SmallVec<[&ModDef; 16]> = self.mods.iter().collect();
        assign(set, &mods)
    }

    /// Like [`check`](Self::check) with `extra` mods placed alongside the locked ones.
    pub fn check_with(
        &self,
        set: &[Candidate<'_>; BUCKET_COUNT],
        extra: &[&ModDef],
    ) -> Result<ModAssignment, AssignmentFailure> {
        if let Some(conflict) = self.conflict {
            return Err(AssignmentFailure::Exclusivity(conflict));
        }
        let mut mods: SmallVec<[&ModDef; 16]> =
            self.mods.iter().chain(extra.iter().copied()).collect();
        if let Some(conflict) = find_conflict(mods.iter().copied()) {
            return Err(AssignmentFailure::Exclusivity(conflict));
        }
        mods.sort_by(|a, b| placement_order(a, b));
        assign(set, &mods)
    }
}

fn assign(
    set: &[Candidate<'_>; BUCKET_COUNT],
    mods: &[&ModDef],
) -> Result<ModAssignment, AssignmentFailure> {
    let mut placement = Placement {
        set,
        state: set.map(|c| SlotState {
            remaining: i16::from(c.energy),
            used: 0,
        }),
        placed: Default::default(),
    };
    if !placement.place(mods) {
        return Err(AssignmentFailure::NoFit);
    }
    let mut slots = placement.placed;
    for slot in &mut slots {
        slot.sort_by_key(|placed| placed.socket);
    }
    Ok(ModAssignment { slots })
}
