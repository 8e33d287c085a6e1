//! Deterministic loadout search.
//!
//! No IO, no network. Every invocation takes an immutable snapshot of the
//! catalog, inventory and request and returns a ranked result.

pub mod auto_mods;
pub mod catalog;
mod error;
pub mod filter;
pub mod mod_assignment;
pub mod monitor;
mod process;
pub mod ranking;
pub mod search;
mod stats;
pub mod synth;
mod types;

pub use auto_mods::{AutoModPicker, AutoPick};
pub use catalog::{resolve_inventory, resolve_mods, ItemsByBucket, LookupMiss};
pub use error::InputError;
pub use filter::{filter_items, CandidatePools, FilterReason, FilterReport};
pub use mod_assignment::{AssignmentFailure, ExclusivityConflict, ModAssignmentChecker};
pub use monitor::{CancellationToken, SearchMonitor, SearchProgress, Unmonitored};
pub use process::{process, NoResultsReason, SearchOutcome, SearchResult};
pub use ranking::{canonical_key, compare_sets, RankOrder, SetCollector, StatEnvelope, StatRange};
pub use search::{search, ProcessInfo};
pub use stats::*;
pub use types::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
