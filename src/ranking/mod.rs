//! Ranking: fold rule scores into per-category totals and assign levels.

pub mod category;
pub mod engine;
pub mod level;

pub use category::{AffinityBonus, CategoryPlan, Passion, TaskCategory};
pub use engine::{
    AgentBreakdown, BreakdownSet, CategoryBreakdown, Contribution, RankingEngine, RankingSummary,
};
pub use level::{LevelMode, PriorityLevel, assign_levels, rank_order};
