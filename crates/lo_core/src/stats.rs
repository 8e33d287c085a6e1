//! Stat dimensions, stat vectors and tier arithmetic.
//!
//! Pure data. Tiers are only ever derived from a fully aggregated vector;
//! nothing in the search interpolates tiers from partial sums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Sub};

/// Stat points per tier.
pub const TIER_SIZE: i32 = 10;
/// Highest tier a stat can reach; values above `MAX_TIER * TIER_SIZE` are wasted.
pub const MAX_TIER: u8 = 10;
pub const STAT_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Mobility,
    Resilience,
    Recovery,
    Discipline,
    Intellect,
    Strength,
}

impl Stat {
    pub const ALL: [Stat; STAT_COUNT] = [
        Stat::Mobility,
        Stat::Resilience,
        Stat::Recovery,
        Stat::Discipline,
        Stat::Intellect,
        Stat::Strength,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stat::Mobility => "mobility",
            Stat::Resilience => "resilience",
            Stat::Recovery => "recovery",
            Stat::Discipline => "discipline",
            Stat::Intellect => "intellect",
            Stat::Strength => "strength",
        }
    }

    /// Three-letter column header used by the CLI table.
    pub fn short(self) -> &'static str {
        match self {
            Stat::Mobility => "mob",
            Stat::Resilience => "res",
            Stat::Recovery => "rec",
            Stat::Discipline => "dis",
            Stat::Intellect => "int",
            Stat::Strength => "str",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tier of a raw stat value: `floor(value / TIER_SIZE)` clamped to `0..=MAX_TIER`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn tier(value: i32) -> u8 {
    (value.max(0) / TIER_SIZE).min(i32::from(MAX_TIER)) as u8
}

/// Raw value needed to reach `tier`.
pub fn tier_floor(tier: u8) -> i32 {
    i32::from(tier) * TIER_SIZE
}

/// Fixed-size stat vector indexed by [`Stat`]. Values may be negative
/// (some mods and subclass fragments subtract stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatVector(pub [i32; STAT_COUNT]);

impl StatVector {
    pub const ZERO: StatVector = StatVector([0; STAT_COUNT]);

    pub fn from_pairs(pairs: &[(Stat, i32)]) -> Self {
        let mut v = StatVector::ZERO;
        for &(stat, value) in pairs {
            v[stat] += value;
        }
        v
    }

    /// Same value in every dimension.
    pub fn splat(value: i32) -> Self {
        StatVector([value; STAT_COUNT])
    }

    pub fn get(&self, stat: Stat) -> i32 {
        self.0[stat.index()]
    }

    pub fn tier(&self, stat: Stat) -> u8 {
        tier(self.get(stat))
    }

    pub fn tiers(&self) -> [u8; STAT_COUNT] {
        self.0.map(tier)
    }

    pub fn total(&self) -> i32 {
        self.0.iter().sum()
    }

    /// Element-wise maximum.
    #[must_use]
    pub fn max(&self, other: &StatVector) -> StatVector {
        let mut out = *self;
        for (a, b) in out.0.iter_mut().zip(other.0.iter()) {
            *a = (*a).max(*b);
        }
        out
    }

    /// Points missing in each dimension to reach `targets`; zero where already met.
    pub fn deficit_to(&self, targets: &StatVector) -> StatVector {
        let mut out = StatVector::ZERO;
        for stat in Stat::ALL {
            out[stat] = (targets[stat] - self[stat]).max(0);
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// Stats where a +5 minor mod would lift the value into the next tier.
    pub fn half_tier_stats(&self, enabled: impl IntoIterator<Item = Stat>) -> Vec<Stat> {
        enabled
            .into_iter()
            .filter(|&stat| {
                let value = self[stat].max(0);
                self.tier(stat) < MAX_TIER && value % TIER_SIZE >= TIER_SIZE / 2
            })
            .collect()
    }
}

impl Index<Stat> for StatVector {
    type Output = i32;

    fn index(&self, stat: Stat) -> &i32 {
        &self.0[stat.index()]
    }
}

impl IndexMut<Stat> for StatVector {
    fn index_mut(&mut self, stat: Stat) -> &mut i32 {
        &mut self.0[stat.index()]
    }
}

impl Add for StatVector {
    type Output = StatVector;

    fn add(mut self, rhs: StatVector) -> StatVector {
        self += rhs;
        self
    }
}

impl AddAssign for StatVector {
    fn add_assign(&mut self, rhs: StatVector) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += *b;
        }
    }
}

impl Sub for StatVector {
    type Output = StatVector;

    fn sub(mut self, rhs: StatVector) -> StatVector {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a -= *b;
        }
        self
    }
}

impl std::iter::Sum for StatVector {
    fn sum<I: Iterator<Item = StatVector>>(iter: I) -> StatVector {
        iter.fold(StatVector::ZERO, Add::add)
    }
}
