//! Signal evaluation: build a population, filter it, reduce it.
//!
//! Each [`SourceKind`] maps to one [`SourceFn`] in a dispatch table built
//! when the engine is created. A source function only produces the
//! population's [`Member`]s; grouping and reduction are shared.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::{EvalError, EvalResult};
use crate::filter::{Candidate, FilterEvaluator};
use crate::world::{AgentId, World, ZoneId, ZoneKey};

use super::definition::{SignalDefinition, SignalSource, SourceKind};

/// Sentinel for a member value that could not be resolved.
pub const INVALID_VALUE: f64 = -1.0;

/// One measured member of a signal's population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Member {
    /// Measured value, or [`INVALID_VALUE`] on a lookup miss.
    pub value: f64,
    pub zone: Option<ZoneId>,
    pub agent: Option<AgentId>,
}

impl Member {
    fn valid(&self) -> bool {
        self.value != INVALID_VALUE && !self.value.is_nan()
    }
}

/// Everything a source function may read.
pub struct SourceInput<'a> {
    pub world: &'a dyn World,
    pub filters: &'a FilterEvaluator,
    pub definition: &'a SignalDefinition,
}

/// Produces the filtered population for one source kind.
pub type SourceFn = fn(&SourceInput<'_>) -> EvalResult<Vec<Member>>;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Mean and spread of the valid per-agent values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl PopulationStats {
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<Self> {
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut count = 0usize;
        for &v in values {
            if v == INVALID_VALUE || v.is_nan() {
                continue;
            }
            sum += v;
            min = min.min(v);
            max = max.max(v);
            count += 1;
        }
        (count > 0).then(|| Self {
            mean: sum / count as f64,
            min,
            max,
            count,
        })
    }
}

/// The computed value of one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalValue {
    pub global: f64,
    /// Present only for locatable signals.
    pub per_zone: Option<BTreeMap<ZoneKey, f64>>,
    /// Present only for individualizable signals.
    pub per_agent: Option<BTreeMap<AgentId, f64>>,
    /// Statistics over `per_agent`, when present and non-empty.
    pub stats: Option<PopulationStats>,
}

impl SignalValue {
    pub fn zero() -> Self {
        Self::scalar(0.0)
    }

    pub fn scalar(global: f64) -> Self {
        Self {
            global,
            per_zone: None,
            per_agent: None,
            stats: None,
        }
    }

    /// Value for a zone key. A zone with no members is 0; a signal without
    /// a per-zone breakdown yields `None`.
    pub fn zone_value(&self, key: ZoneKey) -> Option<f64> {
        self.per_zone
            .as_ref()
            .map(|zones| zones.get(&key).copied().unwrap_or(0.0))
    }

    /// Value for one agent; `None` when the agent is absent or its raw
    /// measurement missed.
    pub fn agent_value(&self, agent: AgentId) -> Option<f64> {
        self.per_agent
            .as_ref()
            .and_then(|agents| agents.get(&agent).copied())
            .filter(|v| *v != INVALID_VALUE && !v.is_nan())
    }

    /// Agent value minus the population mean.
    pub fn distance_from_mean(&self, agent: AgentId) -> Option<f64> {
        let value = self.agent_value(agent)?;
        self.stats.map(|stats| value - stats.mean)
    }

    /// Distance from the mean scaled by the population range into [-1, 1].
    /// A population with no spread yields 0 for every member.
    pub fn normalized_rank(&self, agent: AgentId) -> Option<f64> {
        let value = self.agent_value(agent)?;
        let stats = self.stats?;
        let range = stats.max - stats.min;
        if range.abs() < f64::EPSILON {
            Some(0.0)
        } else {
            Some(((value - stats.mean) / range).clamp(-1.0, 1.0))
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluates [`SignalDefinition`]s against a world.
pub struct SignalEngine {
    evaluators: HashMap<SourceKind, SourceFn>,
    filters: FilterEvaluator,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalEngine {
    /// An engine with the built-in evaluator for every source kind.
    pub fn new() -> Self {
        let mut engine = Self::empty();
        engine.register(SourceKind::ObjectCount, object_count);
        engine.register(SourceKind::AgentCount, agent_members);
        engine.register(SourceKind::AgentAttribute, agent_members);
        engine.register(SourceKind::AgentNeed, agent_members);
        engine.register(SourceKind::ConstructionProgress, construction_progress);
        engine.register(SourceKind::EnvironmentCondition, environment);
        engine.register(SourceKind::Weather, environment);
        engine.register(SourceKind::TraitCount, agent_members);
        engine.register(SourceKind::AfflictionCount, agent_members);
        engine
    }

    /// An engine with no evaluators registered.
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
            filters: FilterEvaluator::new(),
        }
    }

    /// Install or replace the evaluator for a source kind.
    pub fn register(&mut self, kind: SourceKind, f: SourceFn) {
        self.evaluators.insert(kind, f);
    }

    pub fn filters(&self) -> &FilterEvaluator {
        &self.filters
    }

    /// Evaluate one definition.
    pub fn evaluate(&self, world: &dyn World, definition: &SignalDefinition) -> EvalResult<SignalValue> {
        let kind = definition.source.kind();
        let evaluator = self
            .evaluators
            .get(&kind)
            .ok_or_else(|| EvalError::MissingEvaluator {
                kind: kind.to_string(),
            })?;

        let members = evaluator(&SourceInput {
            world,
            filters: &self.filters,
            definition,
        })?;

        Ok(reduce(world, definition, &members))
    }

    /// Evaluate one definition, logging any failure and yielding zero.
    pub fn evaluate_or_zero(&self, world: &dyn World, definition: &SignalDefinition) -> SignalValue {
        match self.evaluate(world, definition) {
            Ok(value) => value,
            Err(EvalError::MissingEvaluator { kind }) => {
                tracing::warn!(signal = %definition.name, kind = %kind, "no evaluator for source kind, signal is 0");
                SignalValue::zero()
            }
            Err(e) => {
                tracing::warn!(signal = %definition.name, error = %e, "signal evaluation failed, signal is 0");
                SignalValue::zero()
            }
        }
    }
}

/// Reduce members into the global value plus the breakdowns the definition asks for.
fn reduce(world: &dyn World, definition: &SignalDefinition, members: &[Member]) -> SignalValue {
    let aggregation = definition.aggregation;
    let valid: Vec<f64> = members.iter().filter(|m| m.valid()).map(|m| m.value).collect();
    let global = aggregation.reduce(&valid);

    let per_zone = definition.produces_zones().then(|| {
        let mut groups: BTreeMap<ZoneKey, Vec<f64>> = BTreeMap::new();
        for m in members.iter().filter(|m| m.valid()) {
            groups
                .entry(ZoneKey::resolve(world, m.zone))
                .or_default()
                .push(m.value);
        }
        groups
            .into_iter()
            .map(|(key, values)| (key, aggregation.reduce(&values)))
            .collect::<BTreeMap<_, _>>()
    });

    let per_agent = definition.produces_agents().then(|| {
        members
            .iter()
            .filter_map(|m| m.agent.map(|id| (id, if m.valid() { m.value } else { INVALID_VALUE })))
            .collect::<BTreeMap<_, _>>()
    });

    let stats = per_agent
        .as_ref()
        .and_then(|agents| PopulationStats::from_values(agents.values()));

    SignalValue {
        global,
        per_zone,
        per_agent,
        stats,
    }
}

// ---------------------------------------------------------------------------
// Built-in source evaluators
// ---------------------------------------------------------------------------

fn matches_kind(kinds: &[String], def_name: &str) -> bool {
    kinds.is_empty() || kinds.iter().any(|k| k.eq_ignore_ascii_case(def_name))
}

fn object_count(input: &SourceInput<'_>) -> EvalResult<Vec<Member>> {
    let SignalSource::ObjectCount {
        object_kinds,
        use_stack,
    } = &input.definition.source
    else {
        return Err(mismatch(input));
    };
    Ok(input
        .world
        .objects()
        .iter()
        .filter(|o| matches_kind(object_kinds, &o.def_name))
        .filter(|o| {
            input
                .filters
                .matches(input.world, Candidate::Object(o), &input.definition.filter)
        })
        .map(|o| Member {
            value: if *use_stack { f64::from(o.stack_count) } else { 1.0 },
            zone: o.zone,
            agent: None,
        })
        .collect())
}

fn construction_progress(input: &SourceInput<'_>) -> EvalResult<Vec<Member>> {
    let SignalSource::ConstructionProgress { object_kinds } = &input.definition.source else {
        return Err(mismatch(input));
    };
    Ok(input
        .world
        .objects()
        .iter()
        .filter(|o| matches_kind(object_kinds, &o.def_name))
        .filter_map(|o| o.construction.map(|c| (o, c)))
        .filter(|(o, _)| {
            input
                .filters
                .matches(input.world, Candidate::Object(o), &input.definition.filter)
        })
        .map(|(o, c)| Member {
            value: c.remaining_ratio(),
            zone: o.zone,
            agent: None,
        })
        .collect())
}

/// All agent-sourced kinds share population selection; only the measure differs.
fn agent_members(input: &SourceInput<'_>) -> EvalResult<Vec<Member>> {
    let source = &input.definition.source;
    if !source.kind().is_agent_sourced() {
        return Err(mismatch(input));
    }
    let counts_matches = matches!(
        source,
        SignalSource::TraitCount { .. } | SignalSource::AfflictionCount { .. }
    );
    Ok(input
        .world
        .agents()
        .iter()
        .filter(|a| {
            input
                .filters
                .matches(input.world, Candidate::Agent(a), &input.definition.filter)
        })
        .map(|a| {
            let value = match source {
                SignalSource::AgentAttribute { attribute } => {
                    a.attributes.get(attribute).copied().unwrap_or(INVALID_VALUE)
                }
                SignalSource::AgentNeed { need } => a.needs.get(need).copied().unwrap_or(INVALID_VALUE),
                SignalSource::TraitCount { trait_name } => a
                    .traits
                    .iter()
                    .filter(|t| t.eq_ignore_ascii_case(trait_name))
                    .count() as f64,
                SignalSource::AfflictionCount { affliction } => a
                    .afflictions
                    .iter()
                    .filter(|t| t.eq_ignore_ascii_case(affliction))
                    .count() as f64,
                _ => 1.0,
            };
            Member {
                value,
                zone: a.zone,
                agent: Some(a.id),
            }
        })
        // Trait and affliction counts only measure agents that carry one.
        .filter(|m| !counts_matches || m.value > 0.0)
        .collect())
}

fn environment(input: &SourceInput<'_>) -> EvalResult<Vec<Member>> {
    let active = match &input.definition.source {
        SignalSource::EnvironmentCondition { condition } => input.world.condition_active(condition),
        SignalSource::Weather { weathers } => input
            .world
            .weather()
            .is_some_and(|w| weathers.iter().any(|x| x.eq_ignore_ascii_case(w))),
        _ => return Err(mismatch(input)),
    };
    Ok(vec![Member {
        value: if active { 1.0 } else { 0.0 },
        zone: None,
        agent: None,
    }])
}

fn mismatch(input: &SourceInput<'_>) -> EvalError {
    EvalError::Source {
        signal: input.definition.name.clone(),
        message: format!(
            "evaluator registered for the wrong source kind ({})",
            input.definition.source.kind()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;
    use crate::signal::definition::Aggregation;
    use crate::world::{Agent, Construction, WorldObject, WorldSnapshot, ZoneKind};

    fn world() -> WorldSnapshot {
        WorldSnapshot::default()
            .with_zone(1, "Kitchen", ZoneKind::Room)
            .with_zone(2, "Freezer", ZoneKind::Storage)
            .with_zone(3, "Yard", ZoneKind::Outdoors)
            .with_object(WorldObject::item(1, "MealSimple", 2).in_zone(ZoneId(1)))
            .with_object(WorldObject::item(2, "MealSimple", 3).in_zone(ZoneId(2)).stored())
            .with_object(WorldObject::item(3, "MealSimple", 5).in_zone(ZoneId(3)))
            .with_object(WorldObject::item(4, "Steel", 75).stored())
            .with_agent(
                Agent::new(1, "Ada")
                    .with_attribute("Cooking", 10.0)
                    .in_zone(ZoneId(1)),
            )
            .with_agent(Agent::new(2, "Bo").with_attribute("Cooking", 4.0))
            .with_agent(Agent::new(3, "Cy"))
    }

    fn meals() -> SignalDefinition {
        SignalDefinition::new(
            "meals",
            SignalSource::ObjectCount {
                object_kinds: vec!["MealSimple".into()],
                use_stack: true,
            },
        )
    }

    #[test]
    fn aggregations_over_population() {
        let w = world();
        let engine = SignalEngine::new();
        let cases = [
            (Aggregation::Sum, 10.0),
            (Aggregation::Max, 5.0),
            (Aggregation::Min, 2.0),
            (Aggregation::Count, 3.0),
            (Aggregation::FirstOf, 2.0),
        ];
        for (agg, expected) in cases {
            let v = engine.evaluate(&w, &meals().with_aggregation(agg)).unwrap();
            assert_eq!(v.global, expected, "{agg:?}");
        }
        let avg = engine
            .evaluate(&w, &meals().with_aggregation(Aggregation::Average))
            .unwrap();
        assert!((avg.global - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn filter_narrows_population() {
        let w = world();
        let engine = SignalEngine::new();
        let stored = meals().with_filter(FilterSpec::any().include(&["in_storage"]));
        assert_eq!(engine.evaluate(&w, &stored).unwrap().global, 3.0);
    }

    #[test]
    fn empty_population_is_zero() {
        let w = world();
        let engine = SignalEngine::new();
        let none = meals().with_filter(FilterSpec::any().include(&["forbidden"]));
        let v = engine.evaluate(&w, &none.with_aggregation(Aggregation::Min)).unwrap();
        assert_eq!(v.global, 0.0);
    }

    #[test]
    fn non_locatable_has_no_breakdowns() {
        let w = world();
        let v = SignalEngine::new().evaluate(&w, &meals()).unwrap();
        assert!(v.per_zone.is_none());
        assert!(v.per_agent.is_none());
        assert!(v.stats.is_none());
    }

    #[test]
    fn per_zone_merges_outdoors_into_unscoped() {
        let w = world();
        let v = SignalEngine::new().evaluate(&w, &meals().locatable()).unwrap();
        let zones = v.per_zone.as_ref().unwrap();
        assert_eq!(zones[&ZoneKey::Zone(ZoneId(1))], 2.0);
        assert_eq!(zones[&ZoneKey::Zone(ZoneId(2))], 3.0);
        assert_eq!(zones[&ZoneKey::Unscoped], 5.0);
        assert_eq!(zones.values().sum::<f64>(), v.global);
        // A zone with no members reads as 0.
        assert_eq!(v.zone_value(ZoneKey::Zone(ZoneId(42))), Some(0.0));
    }

    #[test]
    fn missing_attribute_is_invalid_and_excluded() {
        let w = world();
        let def = SignalDefinition::new(
            "cooking",
            SignalSource::AgentAttribute {
                attribute: "Cooking".into(),
            },
        )
        .with_aggregation(Aggregation::Average)
        .individualizable();
        let v = SignalEngine::new().evaluate(&w, &def).unwrap();
        assert_eq!(v.global, 7.0);
        assert_eq!(v.agent_value(AgentId(1)), Some(10.0));
        assert_eq!(v.agent_value(AgentId(3)), None);
        let stats = v.stats.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 7.0);
        assert_eq!(v.distance_from_mean(AgentId(2)), Some(-3.0));
        assert_eq!(v.distance_from_mean(AgentId(3)), None);
        assert!((v.normalized_rank(AgentId(1)).unwrap() - 0.5).abs() < 1e-12);
        assert!((v.normalized_rank(AgentId(2)).unwrap() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_spread_normalizes_to_zero() {
        let w = WorldSnapshot::default()
            .with_agent(Agent::new(1, "A").with_attribute("Mining", 5.0))
            .with_agent(Agent::new(2, "B").with_attribute("Mining", 5.0));
        let def = SignalDefinition::new(
            "mining",
            SignalSource::AgentAttribute {
                attribute: "Mining".into(),
            },
        )
        .individualizable();
        let v = SignalEngine::new().evaluate(&w, &def).unwrap();
        assert_eq!(v.normalized_rank(AgentId(1)), Some(0.0));
        assert_eq!(v.normalized_rank(AgentId(2)), Some(0.0));
        assert_eq!(v.distance_from_mean(AgentId(1)), Some(0.0));
    }

    #[test]
    fn construction_progress_measures_remaining_work() {
        let mut frame = WorldObject::item(9, "Wall", 1);
        frame.construction = Some(Construction {
            work_done: 30.0,
            work_total: 120.0,
        });
        let w = WorldSnapshot::default().with_object(frame);
        let def = SignalDefinition::new(
            "walls",
            SignalSource::ConstructionProgress {
                object_kinds: vec![],
            },
        );
        let v = SignalEngine::new().evaluate(&w, &def).unwrap();
        assert!((v.global - 0.75).abs() < 1e-12);
    }

    #[test]
    fn environment_and_weather_are_indicators() {
        let mut w = world();
        w.weather = Some("Rain".into());
        w.conditions.push("ColdSnap".into());
        let engine = SignalEngine::new();
        let rain = SignalDefinition::new(
            "rain",
            SignalSource::Weather {
                weathers: vec!["rain".into(), "Thunderstorm".into()],
            },
        );
        let heat = SignalDefinition::new(
            "heat",
            SignalSource::EnvironmentCondition {
                condition: "HeatWave".into(),
            },
        );
        assert_eq!(engine.evaluate(&w, &rain).unwrap().global, 1.0);
        assert_eq!(engine.evaluate(&w, &heat).unwrap().global, 0.0);
    }

    #[test]
    fn trait_count_counts_matching_agents() {
        let w = WorldSnapshot::default()
            .with_agent(Agent::new(1, "A").with_trait("Pyromaniac"))
            .with_agent(Agent::new(2, "B"))
            .with_agent(Agent::new(3, "C").with_trait("pyromaniac"));
        let def = SignalDefinition::new(
            "pyros",
            SignalSource::TraitCount {
                trait_name: "Pyromaniac".into(),
            },
        );
        assert_eq!(SignalEngine::new().evaluate(&w, &def).unwrap().global, 2.0);
        let counted = SignalEngine::new()
            .evaluate(&w, &def.with_aggregation(Aggregation::Count))
            .unwrap();
        assert_eq!(counted.global, 2.0);
    }

    #[test]
    fn missing_evaluator_yields_zero() {
        let w = world();
        let engine = SignalEngine::empty();
        assert!(matches!(
            engine.evaluate(&w, &meals()),
            Err(EvalError::MissingEvaluator { .. })
        ));
        assert_eq!(engine.evaluate_or_zero(&w, &meals()), SignalValue::zero());
    }

    #[test]
    fn failing_evaluator_yields_zero() {
        fn broken(input: &SourceInput<'_>) -> EvalResult<Vec<Member>> {
            Err(EvalError::Source {
                signal: input.definition.name.clone(),
                message: "world unavailable".into(),
            })
        }
        let w = world();
        let mut engine = SignalEngine::new();
        engine.register(SourceKind::ObjectCount, broken);
        assert_eq!(engine.evaluate_or_zero(&w, &meals()).global, 0.0);
    }
}
