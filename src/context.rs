//! The per-cycle evaluation context.
//!
//! One context is built at the start of each cycle, after the signal
//! snapshot for that cycle has been swapped in, and is passed by reference
//! through rule evaluation and ranking. Nothing downstream reaches for
//! global state.

use std::sync::Arc;

use crate::filter::FilterEvaluator;
use crate::signal::SignalSnapshot;
use crate::world::World;

pub struct EvaluationContext<'a> {
    pub world: &'a dyn World,
    /// Signal values every rule in this cycle reads.
    pub signals: Arc<SignalSnapshot>,
    pub filters: &'a FilterEvaluator,
    /// Base score for rules that set no `default_score`.
    pub neutral_score: f64,
    pub tick: u64,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(world: &'a dyn World, signals: Arc<SignalSnapshot>, filters: &'a FilterEvaluator) -> Self {
        let tick = world.tick();
        Self {
            world,
            signals,
            filters,
            neutral_score: 0.0,
            tick,
        }
    }

    pub fn with_neutral_score(mut self, score: f64) -> Self {
        self.neutral_score = score;
        self
    }
}
