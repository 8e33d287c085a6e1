use thiserror::Error;

use crate::{Bucket, ItemId, Stat};

/// Malformed input, rejected before the search starts.
///
/// This is the only failure `process` surfaces. Infeasible combinations,
/// cancellation and catalog misses are reported through the result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("item {0} is both pinned and excluded")]
    PinnedAndExcluded(ItemId),
    #[error("pinned {bucket} item {item} is not in the {bucket} pool")]
    PinnedItemMissing { bucket: Bucket, item: ItemId },
    #[error("item {item} is listed under {listed} but belongs to {actual}")]
    MisplacedItem {
        item: ItemId,
        listed: Bucket,
        actual: Bucket,
    },
    #[error("item {0} appears more than once in the inventory")]
    DuplicateItem(ItemId),
    #[error("stat order must list every stat exactly once")]
    InvalidStatOrder,
    #[error("{stat} constraint has min tier {min} above max tier {max}")]
    InvertedConstraint { stat: Stat, min: u8, max: u8 },
    #[error("{stat} constraint tier {tier} is above the maximum tier")]
    TierOutOfRange { stat: Stat, tier: u8 },
}
