// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # rankwork
//!
//! A rule-driven work-priority engine for simulated worlds. Many small,
//! independently authored scoring rules are folded into one ranked priority
//! level per agent per task category.
//!
//! ## Architecture
//!
//! - **Filters** (`filter`): tag-based predicates over world objects and agents
//! - **Signals** (`signal`): named scalar metrics with per-zone and per-agent breakdowns
//! - **Rules** (`rule`): filter gates, interpolated score ranges and external modifiers
//! - **Ranking** (`ranking`): per-category totals with deduplication, percentile levels
//! - **Scheduling** (`scheduler`, `engine`): urgent and normal cadences over a tick clock
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use rankwork::config::EngineConfig;
//! use rankwork::engine::Engine;
//! use rankwork::registry::DefinitionRegistry;
//! use rankwork::world::{AgentId, AssignedPriorities, WorldSnapshot};
//!
//! let registry = DefinitionRegistry::load(Path::new("data/demo/definitions.toml")).unwrap();
//! let world = WorldSnapshot::load(Path::new("data/demo/world.json")).unwrap();
//! let engine = Engine::new(EngineConfig::default(), registry).unwrap();
//!
//! let mut levels = AssignedPriorities::default();
//! engine.run_normal_cycle(&world, &mut levels);
//! println!("{:?}", levels.get(AgentId(1), "Cooking"));
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod filter;
pub mod interval;
pub mod ranking;
pub mod registry;
pub mod rule;
pub mod scheduler;
pub mod signal;
pub mod snapshot;
pub mod world;
