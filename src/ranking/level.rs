//! Discrete priority levels and the percentile buckets that assign them.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

/// The level applied to one agent's task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Disabled,
    /// Two-level mode only.
    Enabled,
    /// Five-level mode: 1 is the most urgent, 4 the least.
    Level(u8),
}

impl PriorityLevel {
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.pad("-"),
            Self::Enabled => f.pad("on"),
            Self::Level(n) => f.pad(&n.to_string()),
        }
    }
}

/// How many levels the host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelMode {
    /// Four priority levels plus disabled, one per 20% band.
    #[default]
    Five,
    /// Enabled for the top 60%, disabled for the rest.
    Two,
}

impl LevelMode {
    /// Level for position `rank` (0 = highest score) in a list of `count`.
    pub fn level_for(self, rank: usize, count: usize) -> PriorityLevel {
        if count == 0 {
            return PriorityLevel::Disabled;
        }
        match self {
            Self::Five => match rank * 5 / count {
                bucket @ 0..=3 => PriorityLevel::Level(bucket as u8 + 1),
                _ => PriorityLevel::Disabled,
            },
            Self::Two if rank * 5 < count * 3 => PriorityLevel::Enabled,
            Self::Two => PriorityLevel::Disabled,
        }
    }
}

/// Indices of `totals` ordered by descending total; ties keep input order.
pub fn rank_order(totals: &[i64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..totals.len()).collect();
    order.sort_by_key(|&i| Reverse(totals[i]));
    order
}

/// The level each entry of `totals` receives, in input order.
pub fn assign_levels(totals: &[i64], mode: LevelMode) -> Vec<PriorityLevel> {
    let mut levels = vec![PriorityLevel::Disabled; totals.len()];
    for (rank, index) in rank_order(totals).into_iter().enumerate() {
        levels[index] = mode.level_for(rank, totals.len());
    }
    levels
}
