//! Rule evaluation: gate, modulate, look up, interpolate.
//!
//! Filter gates are checked before anything else regardless of where they
//! appear in the condition list. The remaining conditions run in
//! declaration order: modifier lookups fold into a running multiplier and
//! offset, signal lookups replace the base score with the interpolated
//! score of the first matching range.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::filter::Candidate;
use crate::world::{Agent, AgentId, ZoneKey};

use super::definition::{Condition, RequestMode, RuleDefinition};
use super::modifier::{ModifierProvider, NoModifiers};

/// Description of a rule vetoed by a filter gate.
pub const GATE_FAILED: &str = "does not match filter criteria";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The outcome of one rule for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleScore {
    pub score: i32,
    pub description: String,
    /// Gates passed and, if the rule looks up signals, a range matched.
    pub matched: bool,
}

impl RuleScore {
    /// The vetoed result.
    pub fn gated() -> Self {
        Self {
            score: 0,
            description: GATE_FAILED.to_string(),
            matched: false,
        }
    }

    /// Neutral zero, used when evaluation failed.
    pub fn zero() -> Self {
        Self {
            score: 0,
            description: "Priority 0".to_string(),
            matched: false,
        }
    }

    /// Whether this result belongs in a displayed breakdown.
    pub fn is_visible(&self) -> bool {
        self.matched || self.score != 0
    }
}

/// Rule scores for every agent, produced by one cycle.
#[derive(Debug, Clone, Default)]
pub struct RuleScoreTable {
    pub tick: u64,
    scores: HashMap<AgentId, HashMap<String, RuleScore>>,
}

impl RuleScoreTable {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            scores: HashMap::new(),
        }
    }

    pub fn insert(&mut self, agent: AgentId, rule: impl Into<String>, score: RuleScore) {
        self.scores.entry(agent).or_default().insert(rule.into(), score);
    }

    pub fn get(&self, agent: AgentId, rule: &str) -> Option<&RuleScore> {
        self.scores.get(&agent)?.get(rule)
    }

    /// Every rule score recorded for `agent`.
    pub fn for_agent(&self, agent: AgentId) -> Option<&HashMap<String, RuleScore>> {
        self.scores.get(&agent)
    }

    pub fn agent_count(&self) -> usize {
        self.scores.len()
    }

    /// A copy of `self` with every entry of `updates` laid over it.
    pub fn merged(&self, updates: &RuleScoreTable) -> Self {
        let mut next = self.clone();
        next.tick = updates.tick;
        for (agent, rules) in &updates.scores {
            let entry = next.scores.entry(*agent).or_default();
            for (name, score) in rules {
                entry.insert(name.clone(), score.clone());
            }
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluates [`RuleDefinition`]s for agents.
pub struct RuleEngine {
    modifiers: Arc<dyn ModifierProvider>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// An engine with no modifier extension installed.
    pub fn new() -> Self {
        Self {
            modifiers: Arc::new(NoModifiers),
        }
    }

    pub fn with_modifiers(modifiers: Arc<dyn ModifierProvider>) -> Self {
        Self { modifiers }
    }

    pub fn modifiers(&self) -> &dyn ModifierProvider {
        self.modifiers.as_ref()
    }

    /// Score one rule for one agent.
    pub fn evaluate_for_agent(
        &self,
        ctx: &EvaluationContext<'_>,
        rule: &RuleDefinition,
        agent: &Agent,
    ) -> EvalResult<RuleScore> {
        let gated = rule.conditions.iter().any(|c| match c {
            Condition::FilterGate(filter) => {
                !ctx.filters.matches(ctx.world, Candidate::Agent(agent), filter)
            }
            _ => false,
        });
        if gated {
            return Ok(RuleScore::gated());
        }

        let mut base = rule.default_score.unwrap_or(ctx.neutral_score);
        let mut multiplier = 1.0;
        let mut offset = 0.0;
        let mut description = None;
        let mut looked_up = false;

        for condition in &rule.conditions {
            match condition {
                Condition::FilterGate(_) => {}
                Condition::ModifierLookup { key, ranges } => {
                    let Some(value) = self.modifiers.lookup(agent, key)? else {
                        continue;
                    };
                    if let Some(range) = ranges.iter().find(|r| r.validity.contains(value)) {
                        multiplier *= range.multiplier;
                        offset += range.offset;
                    }
                }
                Condition::SignalLookup { signal, mode } => {
                    looked_up = true;
                    let Some(value) = resolve(ctx, signal, *mode, agent).filter(|v| !v.is_nan()) else {
                        tracing::trace!(rule = %rule.name, signal = %signal, agent = %agent.id, "signal lookup missed");
                        continue;
                    };
                    if let Some(range) = rule.range_for(value) {
                        base = range.score_for(value);
                        description = Some(range.description.clone());
                    }
                }
            }
        }

        let raw = base * multiplier + offset;
        if !raw.is_finite() {
            return Err(EvalError::Score {
                rule: rule.name.clone(),
                message: format!("non-finite score {raw}"),
            });
        }
        let score = raw.round() as i32;
        let matched = !looked_up || description.is_some();
        let description = match description {
            Some(d) if !d.is_empty() => d,
            _ => format!("Priority {score}"),
        };
        tracing::trace!(rule = %rule.name, agent = %agent.id, score, "rule scored");
        Ok(RuleScore {
            score,
            description,
            matched,
        })
    }

    /// Score one rule for one agent; failures are logged and score zero.
    pub fn score_or_zero(&self, ctx: &EvaluationContext<'_>, rule: &RuleDefinition, agent: &Agent) -> RuleScore {
        self.evaluate_for_agent(ctx, rule, agent).unwrap_or_else(|e| {
            tracing::warn!(rule = %rule.name, agent = %agent.id, error = %e, "rule evaluation failed, contributing 0");
            RuleScore::zero()
        })
    }

    /// Score every rule for every agent in the world.
    pub fn evaluate_all<'r>(
        &self,
        ctx: &EvaluationContext<'_>,
        rules: impl IntoIterator<Item = &'r RuleDefinition> + Clone,
    ) -> RuleScoreTable {
        let mut table = RuleScoreTable::new(ctx.tick);
        for agent in ctx.world.agents() {
            for rule in rules.clone() {
                table.insert(agent.id, rule.name.clone(), self.score_or_zero(ctx, rule, agent));
            }
        }
        table
    }
}

/// The value a lookup reads, `None` on a miss.
fn resolve(ctx: &EvaluationContext<'_>, signal: &str, mode: RequestMode, agent: &Agent) -> Option<f64> {
    let value = ctx.signals.get(signal)?;
    match mode {
        RequestMode::Global => Some(value.global),
        RequestMode::ZoneOfAgent => value.zone_value(ZoneKey::resolve(ctx.world, agent.zone)),
        RequestMode::Agent => value.agent_value(agent.id),
        RequestMode::AgentDistanceFromMean => value.distance_from_mean(agent.id),
        RequestMode::AgentNormalizedRank => value.normalized_rank(agent.id),
    }
}
