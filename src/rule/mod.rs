//! Rules: declarative scoring units evaluated per agent.

pub mod definition;
pub mod engine;
pub mod modifier;

pub use definition::{Condition, ModifierRange, RequestMode, RuleDefinition, ScoreRange, TaskTarget};
pub use engine::{GATE_FAILED, RuleEngine, RuleScore, RuleScoreTable};
pub use modifier::{ModifierEntry, ModifierProvider, NoModifiers, StaticModifiers};
