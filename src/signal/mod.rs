//! Signals: named scalar metrics computed from world and agent state.
//!
//! A [`SignalDefinition`] selects a population (objects or agents), filters
//! it, measures each member and reduces the measurements with an
//! [`Aggregation`]. Locatable signals also carry a per-zone breakdown and
//! individualizable ones a per-agent breakdown.

pub mod cache;
pub mod definition;
pub mod engine;
pub mod store;

pub use cache::SignalCache;
pub use definition::{Aggregation, SignalDefinition, SignalSource, SourceKind};
pub use engine::{
    INVALID_VALUE, Member, PopulationStats, SignalEngine, SignalValue, SourceFn, SourceInput,
};
pub use store::{SignalSnapshot, SignalStore};
