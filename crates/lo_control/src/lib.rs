use lo_core::{
    AssumeMasterwork, Bucket, ExoticLock, ItemId, ModHash, SearchRequest, Stat, StatConstraint,
    StatVector, MAX_TIER,
};
use serde::{Deserialize, Serialize};

/// Undo steps retained; older snapshots are dropped.
const HISTORY_LIMIT: usize = 100;

/// One edit to the optimizer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Pins `item` into `bucket`, replacing any previous pin there. The item
    /// is removed from the excluded set.
    PinItem { bucket: Bucket, item: ItemId },
    UnpinBucket { bucket: Bucket },
    ClearPinned,
    /// Excludes `item` and drops it from any pin.
    ExcludeItem { item: ItemId },
    UnexcludeItem { item: ItemId },
    ClearExcluded,
    /// Locks one more copy of a mod.
    LockMod { hash: ModHash },
    /// Removes one copy of a locked mod.
    UnlockMod { hash: ModHash },
    ClearMods,
    /// Sets the minimum tier, raising the maximum if it would fall below.
    SetStatMin { stat: Stat, tier: u8 },
    /// Sets the maximum tier, lowering the minimum if it would exceed it.
    SetStatMax { stat: Stat, tier: u8 },
    SetStatIgnored { stat: Stat, ignored: bool },
    /// Ignored unless `order` lists every stat exactly once.
    SetStatOrder { order: Vec<Stat> },
    SetExoticLock { lock: ExoticLock },
    SetAssumeMasterwork { rule: AssumeMasterwork },
    SetAutoStatMods { enabled: bool },
    SetSubclassStats { stats: StatVector },
    SetQuery { query: String },
}

/// Everything a search depends on besides the inventory.
#[derive(Debug, Clone, Default, PartialEq)]
struct Parameters {
    request: SearchRequest,
    query: String,
}

/// The subset of parameters persisted between sessions. Pins, exclusions,
/// locked mods, the exotic lock, the query and min/max tiers are per-session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedParameters {
    #[serde(default)]
    pub assume_masterwork: AssumeMasterwork,
    #[serde(default)]
    pub auto_stat_mods: bool,
    #[serde(default = "default_stat_order")]
    pub stat_order: Vec<Stat>,
    #[serde(default)]
    pub ignored: Vec<Stat>,
}

fn default_stat_order() -> Vec<Stat> {
    Stat::ALL.to_vec()
}

impl Default for SavedParameters {
    fn default() -> Self {
        SavedParameters {
            assume_masterwork: AssumeMasterwork::default(),
            auto_stat_mods: false,
            stat_order: default_stat_order(),
            ignored: Vec::new(),
        }
    }
}

/// Optimizer parameter state driven by explicit [`Action`]s.
///
/// Every change produces a new immutable [`SearchRequest`] snapshot via
/// [`OptimizerState::request`]; actions that change nothing are not recorded
/// in the undo history.
#[derive(Debug, Clone, Default)]
pub struct OptimizerState {
    current: Parameters,
    undo: Vec<Parameters>,
    redo: Vec<Parameters>,
}

impl OptimizerState {
    pub fn new() -> Self {
        OptimizerState::default()
    }

    /// Restores persisted parameters. An invalid stat order falls back to
    /// the default order.
    pub fn from_saved(saved: &SavedParameters) -> Self {
        let mut request = SearchRequest {
            auto_stat_mods: saved.auto_stat_mods,
            ..SearchRequest::default()
        };
        request.energy_rules.assume_masterwork = saved.assume_masterwork;
        if is_permutation(&saved.stat_order) {
            request.stat_order.clone_from(&saved.stat_order);
        }
        for &stat in &saved.ignored {
            update_constraint(&mut request, stat, |c| c.ignored = true);
        }
        OptimizerState {
            current: Parameters {
                request,
                query: String::new(),
            },
            ..OptimizerState::default()
        }
    }

    /// Starts from an existing request, e.g. one loaded from a file.
    pub fn with_request(request: SearchRequest, query: &str) -> Self {
        OptimizerState {
            current: Parameters {
                request,
                query: query.trim().to_string(),
            },
            ..OptimizerState::default()
        }
    }

    /// Applies `action`. Returns whether the parameters changed.
    pub fn apply(&mut self, action: &Action) -> bool {
        let mut next = self.current.clone();
        reduce(&mut next, action);
        if next == self.current {
            return false;
        }
        self.undo.push(std::mem::replace(&mut self.current, next));
        if self.undo.len() > HISTORY_LIMIT {
            self.undo.remove(0);
        }
        self.redo.clear();
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.redo.push(std::mem::replace(&mut self.current, previous));
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(std::mem::replace(&mut self.current, next));
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Snapshot of the current parameters for one search invocation.
    pub fn request(&self) -> SearchRequest {
        self.current.request.clone()
    }

    pub fn query(&self) -> &str {
        &self.current.query
    }

    pub fn saved_parameters(&self) -> SavedParameters {
        let request = &self.current.request;
        SavedParameters {
            assume_masterwork: request.energy_rules.assume_masterwork,
            auto_stat_mods: request.auto_stat_mods,
            stat_order: request.stat_order.clone(),
            ignored: Stat::ALL
                .into_iter()
                .filter(|&stat| request.constraint(stat).ignored)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn reduce(params: &mut Parameters, action: &Action) {
    let request = &mut params.request;
    match action {
        Action::PinItem { bucket, item } => {
            request.excluded.remove(item);
            request.pinned.retain(|_, pinned| pinned != item);
            request.pinned.insert(*bucket, *item);
        }
        Action::UnpinBucket { bucket } => {
            request.pinned.remove(bucket);
        }
        Action::ClearPinned => request.pinned.clear(),
        Action::ExcludeItem { item } => {
            request.pinned.retain(|_, pinned| pinned != item);
            request.excluded.insert(*item);
        }
        Action::UnexcludeItem { item } => {
            request.excluded.remove(item);
        }
        Action::ClearExcluded => request.excluded.clear(),
        Action::LockMod { hash } => request.locked_mods.push(*hash),
        Action::UnlockMod { hash } => {
            if let Some(pos) = request.locked_mods.iter().position(|h| h == hash) {
                request.locked_mods.remove(pos);
            }
        }
        Action::ClearMods => request.locked_mods.clear(),
        Action::SetStatMin { stat, tier } => {
            let tier = (*tier).min(MAX_TIER);
            update_constraint(request, *stat, |c| {
                c.min = tier;
                c.max = c.max.max(tier);
            });
        }
        Action::SetStatMax { stat, tier } => {
            let tier = (*tier).min(MAX_TIER);
            update_constraint(request, *stat, |c| {
                c.max = tier;
                c.min = c.min.min(tier);
            });
        }
        Action::SetStatIgnored { stat, ignored } => {
            update_constraint(request, *stat, |c| c.ignored = *ignored);
        }
        Action::SetStatOrder { order } => {
            if is_permutation(order) {
                request.stat_order.clone_from(order);
            }
        }
        Action::SetExoticLock { lock } => request.exotic_lock = *lock,
        Action::SetAssumeMasterwork { rule } => request.energy_rules.assume_masterwork = *rule,
        Action::SetAutoStatMods { enabled } => request.auto_stat_mods = *enabled,
        Action::SetSubclassStats { stats } => request.subclass_stats = *stats,
        Action::SetQuery { query } => params.query = query.trim().to_string(),
    }
}

/// Edits one stat constraint, dropping the entry once it is back to default
/// so equal parameters compare equal.
fn update_constraint(
    request: &mut SearchRequest,
    stat: Stat,
    edit: impl FnOnce(&mut StatConstraint),
) {
    let mut constraint = request.constraint(stat);
    edit(&mut constraint);
    if constraint == StatConstraint::default() {
        request.constraints.remove(&stat);
    } else {
        request.constraints.insert(stat, constraint);
    }
}

fn is_permutation(order: &[Stat]) -> bool {
    order.len() == Stat::ALL.len() && Stat::ALL.iter().all(|stat| order.contains(stat))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(actions: &[Action]) -> OptimizerState {
        let mut state = OptimizerState::new();
        for action in actions {
            state.apply(action);
        }
        state
    }

    #[test]
    fn test_pin_replaces_previous_pin_and_clears_exclusion() {
        let state = state_with(&[
            Action::ExcludeItem { item: ItemId(2) },
            Action::PinItem {
                bucket: Bucket::Helmet,
                item: ItemId(1),
            },
            Action::PinItem {
                bucket: Bucket::Helmet,
                item: ItemId(2),
            },
        ]);
        let request = state.request();
        assert_eq!(request.pinned.len(), 1);
        assert_eq!(request.pinned[&Bucket::Helmet], ItemId(2));
        assert!(request.excluded.is_empty());
    }

    #[test]
    fn test_exclude_unpins_item() {
        let state = state_with(&[
            Action::PinItem {
                bucket: Bucket::Legs,
                item: ItemId(9),
            },
            Action::ExcludeItem { item: ItemId(9) },
        ]);
        let request = state.request();
        assert!(request.pinned.is_empty());
        assert!(request.excluded.contains(&ItemId(9)));
    }

    #[test]
    fn test_unlock_removes_a_single_copy() {
        let hash = ModHash(300);
        let state = state_with(&[
            Action::LockMod { hash },
            Action::LockMod { hash },
            Action::UnlockMod { hash },
        ]);
        assert_eq!(state.request().locked_mods, vec![hash]);
    }

    #[test]
    fn test_min_and_max_stay_ordered() {
        let state = state_with(&[
            Action::SetStatMax {
                stat: Stat::Recovery,
                tier: 5,
            },
            Action::SetStatMin {
                stat: Stat::Recovery,
                tier: 8,
            },
        ]);
        let c = state.request().constraint(Stat::Recovery);
        assert_eq!((c.min, c.max), (8, 8));

        let state = state_with(&[
            Action::SetStatMin {
                stat: Stat::Recovery,
                tier: 7,
            },
            Action::SetStatMax {
                stat: Stat::Recovery,
                tier: 4,
            },
        ]);
        let c = state.request().constraint(Stat::Recovery);
        assert_eq!((c.min, c.max), (4, 4));
    }

    #[test]
    fn test_tiers_clamp_to_max_tier() {
        let state = state_with(&[Action::SetStatMin {
            stat: Stat::Intellect,
            tier: 14,
        }]);
        assert_eq!(state.request().constraint(Stat::Intellect).min, MAX_TIER);
    }

    #[test]
    fn test_invalid_stat_order_is_ignored() {
        let mut state = OptimizerState::new();
        let changed = state.apply(&Action::SetStatOrder {
            order: vec![Stat::Recovery, Stat::Recovery],
        });
        assert!(!changed);
        assert!(!state.can_undo());
        assert_eq!(state.request().stat_order, Stat::ALL.to_vec());
    }

    #[test]
    fn test_resetting_constraint_removes_entry() {
        let state = state_with(&[
            Action::SetStatMin {
                stat: Stat::Mobility,
                tier: 3,
            },
            Action::SetStatMin {
                stat: Stat::Mobility,
                tier: 0,
            },
        ]);
        assert!(state.request().constraints.is_empty());
    }

    #[test]
    fn test_noop_action_is_not_recorded() {
        let mut state = OptimizerState::new();
        assert!(!state.apply(&Action::ClearMods));
        assert!(!state.apply(&Action::SetQuery {
            query: "   ".to_string()
        }));
        assert!(!state.can_undo());
    }

    #[test]
    fn test_undo_redo() {
        let mut state = OptimizerState::new();
        state.apply(&Action::SetAutoStatMods { enabled: true });
        state.apply(&Action::SetQuery {
            query: " is:exotic ".to_string(),
        });
        assert_eq!(state.query(), "is:exotic");

        assert!(state.undo());
        assert_eq!(state.query(), "");
        assert!(state.request().auto_stat_mods);
        assert!(state.undo());
        assert!(!state.request().auto_stat_mods);
        assert!(!state.undo());

        assert!(state.redo());
        assert!(state.request().auto_stat_mods);

        // A new action discards the redo branch.
        state.apply(&Action::ClearMods);
        state.apply(&Action::SetExoticLock {
            lock: ExoticLock::NoExotic,
        });
        assert!(!state.can_redo());
        assert!(!state.redo());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = OptimizerState::new();
        for i in 0..=HISTORY_LIMIT as u64 + 10 {
            state.apply(&Action::ExcludeItem { item: ItemId(i) });
        }
        let mut steps = 0;
        while state.undo() {
            steps += 1;
        }
        assert_eq!(steps, HISTORY_LIMIT);
        assert_eq!(state.request().excluded.len(), 11);
    }

    #[test]
    fn test_saved_parameters_keep_only_persistent_fields() {
        let order = vec![
            Stat::Recovery,
            Stat::Resilience,
            Stat::Discipline,
            Stat::Intellect,
            Stat::Strength,
            Stat::Mobility,
        ];
        let state = state_with(&[
            Action::SetAssumeMasterwork {
                rule: AssumeMasterwork::All,
            },
            Action::SetStatOrder {
                order: order.clone(),
            },
            Action::SetStatIgnored {
                stat: Stat::Mobility,
                ignored: true,
            },
            Action::SetStatMin {
                stat: Stat::Recovery,
                tier: 9,
            },
            Action::PinItem {
                bucket: Bucket::Chest,
                item: ItemId(4),
            },
            Action::SetQuery {
                query: "is:artifice".to_string(),
            },
        ]);

        let saved = state.saved_parameters();
        assert_eq!(saved.assume_masterwork, AssumeMasterwork::All);
        assert_eq!(saved.stat_order, order);
        assert_eq!(saved.ignored, vec![Stat::Mobility]);

        let restored = OptimizerState::from_saved(&saved);
        let request = restored.request();
        assert_eq!(request.stat_order, order);
        assert!(request.constraint(Stat::Mobility).ignored);
        assert_eq!(request.constraint(Stat::Recovery).min, 0);
        assert!(request.pinned.is_empty());
        assert_eq!(restored.query(), "");
        assert!(!restored.can_undo());
    }

    #[test]
    fn test_from_saved_rejects_bad_order() {
        let saved = SavedParameters {
            stat_order: vec![Stat::Strength],
            ..SavedParameters::default()
        };
        let state = OptimizerState::from_saved(&saved);
        assert_eq!(state.request().stat_order, Stat::ALL.to_vec());
    }
}
