//! Post-hoc stat mod selection for sets that fall short of their minimums.
//!
//! Draws only from the catalog's auto-assignable stat mods: for every stat
//! the best general mod ("major"), the cheapest weaker general mod ("minor")
//! and the best artifice mod. Plans are tried fewest mods first, then lowest
//! energy, then the plan that over-delivers most in high-priority stats.

use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::filter::Candidate;
use crate::mod_assignment::ModAssignmentChecker;
use crate::stats::{Stat, StatVector, STAT_COUNT};
use crate::{
    Catalog, ModAssignment, ModCategory, ModDef, ModHash, SocketCategory, BUCKET_COUNT,
};

/// Per-stat plans kept before combining across stats.
const PLANS_PER_STAT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
struct StatMods<'c> {
    major: Option<&'c ModDef>,
    minor: Option<&'c ModDef>,
    artifice: Option<&'c ModDef>,
}

/// The single stat a stat mod raises, if it raises exactly one.
fn single_stat(def: &ModDef) -> Option<(Stat, i32)> {
    let mut raised = Stat::ALL.into_iter().filter(|&s| def.stats[s] != 0);
    let stat = raised.next()?;
    if raised.next().is_some() || def.stats[stat] <= 0 {
        return None;
    }
    Some((stat, def.stats[stat]))
}

/// Higher value wins, then lower cost, then lower hash.
fn better(stat: Stat, a: &ModDef, b: &ModDef) -> bool {
    a.stats[stat]
        .cmp(&b.stats[stat])
        .then(b.energy_cost.cmp(&a.energy_cost))
        .then(b.hash.cmp(&a.hash))
        == Ordering::Greater
}

#[derive(Debug, Clone, Default)]
struct Plan<'c> {
    mods: SmallVec<[&'c ModDef; 8]>,
    general: usize,
    artifice: usize,
    cost: u32,
    added: StatVector,
}

impl<'c> Plan<'c> {
    fn push(&mut self, def: &'c ModDef, count: usize) {
        for _ in 0..count {
            self.mods.push(def);
            self.cost += u32::from(def.energy_cost);
            self.added += def.stats;
        }
        if def.category == ModCategory::Artifice {
            self.artifice += count;
        } else {
            self.general += count;
        }
    }

    fn merged(&self, other: &Plan<'c>) -> Plan<'c> {
        let mut out = self.clone();
        out.mods.extend(other.mods.iter().copied());
        out.general += other.general;
        out.artifice += other.artifice;
        out.cost += other.cost;
        out.added += other.added;
        out
    }

    fn hashes(&self) -> SmallVec<[ModHash; 8]> {
        let mut hashes: SmallVec<[ModHash; 8]> = self.mods.iter().map(|m| m.hash).collect();
        hashes.sort_unstable();
        hashes
    }
}

/// Result of a successful auto-assignment.
#[derive(Debug, Clone)]
pub struct AutoPick {
    pub mods: Vec<ModHash>,
    /// Stat points the picked mods add.
    pub added: StatVector,
    /// Placement of the locked mods together with the picked ones.
    pub assignment: ModAssignment,
}

#[derive(Debug, Clone)]
pub struct AutoModPicker<'c> {
    by_stat: [StatMods<'c>; STAT_COUNT],
    stat_order: SmallVec<[Stat; STAT_COUNT]>,
    max_attempts: usize,
}

impl<'c> AutoModPicker<'c> {
    pub fn new(catalog: &'c Catalog, stat_order: &[Stat]) -> Self {
        let mut by_stat = [StatMods::default(); STAT_COUNT];
        for def in catalog.auto_mods() {
            let Some((stat, _)) = single_stat(def) else {
                continue;
            };
            let slot = &mut by_stat[stat.index()];
            match def.category {
                ModCategory::General => {
                    if slot.major.is_none_or(|m| better(stat, def, m)) {
                        slot.major = Some(def);
                    }
                }
                ModCategory::Artifice => {
                    if slot.artifice.is_none_or(|m| better(stat, def, m)) {
                        slot.artifice = Some(def);
                    }
                }
                _ => {}
            }
        }
        // Minor: the cheapest general mod strictly weaker than the major.
        for def in catalog.auto_mods() {
            let Some((stat, value)) = single_stat(def) else {
                continue;
            };
            let slot = &mut by_stat[stat.index()];
            let Some(major) = slot.major else {
                continue;
            };
            if def.category != ModCategory::General || value >= major.stats[stat] {
                continue;
            }
            let cheaper = slot.minor.is_none_or(|m| {
                (def.energy_cost, std::cmp::Reverse(value), def.hash)
                    < (m.energy_cost, std::cmp::Reverse(m.stats[stat]), m.hash)
            });
            if cheaper {
                slot.minor = Some(def);
            }
        }
        AutoModPicker {
            by_stat,
            stat_order: stat_order.iter().copied().collect(),
            max_attempts: catalog.constants.max_auto_mod_attempts,
        }
    }

    /// Upper bound on the points auto-assignment can add to each stat, on a
    /// set with at most this many general and artifice sockets.
    pub fn budget(&self, general_sockets: usize, artifice_sockets: usize) -> StatVector {
        let mut budget = StatVector::ZERO;
        for stat in Stat::ALL {
            let mods = &self.by_stat[stat.index()];
            let general = mods.major.map_or(0, |m| m.stats[stat]);
            let artifice = mods.artifice.map_or(0, |m| m.stats[stat]);
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            {
                budget[stat] =
                    general * general_sockets as i32 + artifice * artifice_sockets as i32;
            }
        }
        budget
    }

    /// Minimal plans that cover `need` points of `stat` on their own.
    fn stat_plans(
        &self,
        stat: Stat,
        need: i32,
        general_slots: usize,
        artifice_slots: usize,
    ) -> Vec<Plan<'c>> {
        let mods = self.by_stat[stat.index()];
        let value = |m: Option<&ModDef>| m.map_or(0, |m| m.stats[stat]);
        let (major_v, minor_v, artifice_v) =
            (value(mods.major), value(mods.minor), value(mods.artifice));
        let max_major = if mods.major.is_some() { general_slots } else { 0 };
        let max_artifice = if mods.artifice.is_some() { artifice_slots } else { 0 };

        let mut plans = Vec::new();
        for a in 0..=max_major {
            let max_minor = if mods.minor.is_some() { general_slots - a } else { 0 };
            for b in 0..=max_minor {
                for c in 0..=max_artifice {
                    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
                    let total = a as i32 * major_v + b as i32 * minor_v + c as i32 * artifice_v;
                    let minimal = total >= need
                        && (a == 0 || total - major_v < need)
                        && (b == 0 || total - minor_v < need)
                        && (c == 0 || total - artifice_v < need);
                    if !minimal {
                        continue;
                    }
                    let mut plan = Plan::default();
                    if let Some(m) = mods.major {
                        plan.push(m, a);
                    }
                    if let Some(m) = mods.minor {
                        plan.push(m, b);
                    }
                    if let Some(m) = mods.artifice {
                        plan.push(m, c);
                    }
                    plans.push(plan);
                }
            }
        }
        plans.sort_by(|x, y| {
            x.mods
                .len()
                .cmp(&y.mods.len())
                .then(x.cost.cmp(&y.cost))
                .then_with(|| x.hashes().cmp(&y.hashes()))
        });
        plans.truncate(PLANS_PER_STAT);
        plans
    }

    fn compare_plans(&self, x: &Plan<'_>, y: &Plan<'_>) -> Ordering {
        x.mods
            .len()
            .cmp(&y.mods.len())
            .then(x.cost.cmp(&y.cost))
            .then_with(|| {
                let surplus = |p: &Plan<'_>| -> SmallVec<[i32; STAT_COUNT]> {
                    self.stat_order.iter().map(|&s| p.added[s]).collect()
                };
                surplus(y).cmp(&surplus(x))
            })
            .then_with(|| x.hashes().cmp(&y.hashes()))
    }

    /// Picks the cheapest mods closing `deficit` on `set`, placed alongside
    /// the locked mods. `None` when no tried plan fits.
    pub fn pick(
        &self,
        set: &[Candidate<'_>; BUCKET_COUNT],
        deficit: &StatVector,
        checker: &ModAssignmentChecker,
    ) -> Option<AutoPick> {
        let slots = |category: SocketCategory| -> usize {
            set.iter().map(|c| c.item.socket_count(category)).sum()
        };
        let general_slots = slots(SocketCategory::General);
        let artifice_slots = slots(SocketCategory::Artifice);

        let mut plans = vec![Plan::default()];
        for &stat in &self.stat_order {
            let need = deficit[stat];
            if need <= 0 {
                continue;
            }
            let options = self.stat_plans(stat, need, general_slots, artifice_slots);
            let mut next = Vec::with_capacity(plans.len() * options.len());
            for plan in &plans {
                for option in &options {
                    let merged = plan.merged(option);
                    if merged.general <= general_slots && merged.artifice <= artifice_slots {
                        next.push(merged);
                    }
                }
            }
            if next.is_empty() {
                return None;
            }
            plans = next;
        }
        plans.sort_by(|x, y| self.compare_plans(x, y));

        for plan in plans.iter().take(self.max_attempts) {
            if let Ok(assignment) = checker.check_with(set, &plan.mods) {
                return Some(AutoPick {
                    mods: plan.mods.iter().map(|m| m.hash).collect(),
                    added: plan.added,
                    assignment,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::resolve_item;
    use crate::test_fixtures::{self as fx, base_catalog, candidate_set, owned};
    use crate::{Item, ModSocket};

    fn deficit(pairs: &[(Stat, i32)]) -> StatVector {
        StatVector::from_pairs(pairs)
    }

    fn no_locked() -> ModAssignmentChecker {
        ModAssignmentChecker::new(&[])
    }

    fn with_artifice_helmet(catalog: &Catalog, energy: u8) -> [Item; BUCKET_COUNT] {
        let mut items = fx::standard_items(catalog, [energy; BUCKET_COUNT]);
        let mut helmet = owned(1, fx::HELMET_ARTIFICE, StatVector::ZERO);
        helmet.energy_capacity = energy;
        items[0] = resolve_item(catalog, &helmet).unwrap();
        items
    }

    #[test]
    fn one_major_beats_two_minors() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let items = fx::standard_items(&catalog, [10; BUCKET_COUNT]);
        let pick = picker
            .pick(&candidate_set(&items), &deficit(&[(Stat::Mobility, 10)]), &no_locked())
            .unwrap();
        assert_eq!(pick.mods, vec![fx::major_mod(Stat::Mobility)]);
        assert_eq!(pick.added, deficit(&[(Stat::Mobility, 10)]));
    }

    #[test]
    fn cheaper_mod_wins_at_equal_count() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let items = fx::standard_items(&catalog, [10; BUCKET_COUNT]);
        let pick = picker
            .pick(&candidate_set(&items), &deficit(&[(Stat::Recovery, 5)]), &no_locked())
            .unwrap();
        assert_eq!(pick.mods, vec![fx::RECOVERY_MINOR]);
    }

    #[test]
    fn artifice_socket_is_free_energy() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let items = with_artifice_helmet(&catalog, 0);
        let set = candidate_set(&items);
        let pick = picker
            .pick(&set, &deficit(&[(Stat::Intellect, 3)]), &no_locked())
            .unwrap();
        assert_eq!(pick.mods, vec![fx::artifice_mod(Stat::Intellect)]);
        assert!(picker
            .pick(&set, &deficit(&[(Stat::Intellect, 4)]), &no_locked())
            .is_none());
    }

    #[test]
    fn deficits_beyond_five_general_sockets_fail() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let items = fx::standard_items(&catalog, [10; BUCKET_COUNT]);
        let set = candidate_set(&items);
        assert!(picker
            .pick(&set, &deficit(&[(Stat::Mobility, 50)]), &no_locked())
            .is_some());
        assert!(picker
            .pick(&set, &deficit(&[(Stat::Mobility, 51)]), &no_locked())
            .is_none());
    }

    #[test]
    fn locked_mods_consume_general_sockets() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let items = fx::standard_items(&catalog, [10; BUCKET_COUNT]);
        let set = candidate_set(&items);
        let locked: Vec<ModDef> = (0..5)
            .map(|_| catalog.mod_def(fx::major_mod(Stat::Strength)).unwrap().clone())
            .collect();
        let checker = ModAssignmentChecker::new(&locked);
        assert!(picker
            .pick(&set, &deficit(&[(Stat::Mobility, 5)]), &checker)
            .is_none());
    }

    #[test]
    fn covers_several_stats_at_once() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let items = fx::standard_items(&catalog, [10; BUCKET_COUNT]);
        let pick = picker
            .pick(
                &candidate_set(&items),
                &deficit(&[(Stat::Mobility, 10), (Stat::Discipline, 15)]),
                &no_locked(),
            )
            .unwrap();
        assert_eq!(pick.mods.len(), 3);
        assert!(pick.added[Stat::Mobility] >= 10);
        assert!(pick.added[Stat::Discipline] >= 15);
        assert_eq!(pick.assignment.mod_count(), 3);
    }

    #[test]
    fn budget_counts_every_general_and_artifice_socket() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        assert_eq!(picker.budget(5, 5), StatVector::splat(5 * 10 + 5 * 3));
        assert_eq!(picker.budget(10, 0), StatVector::splat(10 * 10));
    }

    #[test]
    fn extra_general_sockets_take_more_mods() {
        let catalog = base_catalog();
        let picker = AutoModPicker::new(&catalog, &Stat::ALL);
        let mut items = fx::standard_items(&catalog, [10; BUCKET_COUNT]);
        for item in &mut items {
            item.sockets.push(ModSocket {
                category: SocketCategory::General,
                plugged: None,
            });
        }
        let pick = picker
            .pick(&candidate_set(&items), &deficit(&[(Stat::Mobility, 70)]), &no_locked())
            .unwrap();
        assert_eq!(pick.mods.len(), 7);
        assert!(pick.added[Stat::Mobility] >= 70);
        assert_eq!(pick.assignment.mod_count(), 7);
    }
}
