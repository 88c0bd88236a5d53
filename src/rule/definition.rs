//! Rule definitions: conditions, score ranges and task targets.

use serde::{Deserialize, Serialize};

use crate::filter::FilterSpec;
use crate::interval::{Interval, interpolate};

/// Which value of a signal a lookup condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// The signal's global scalar.
    #[default]
    Global,
    /// The value for the zone containing the agent.
    ZoneOfAgent,
    /// The agent's own value.
    Agent,
    /// The agent's value minus the population mean.
    AgentDistanceFromMean,
    /// The distance from the mean scaled into [-1, 1] by the population range.
    AgentNormalizedRank,
}

impl RequestMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::ZoneOfAgent => "zone-of-agent",
            Self::Agent => "agent",
            Self::AgentDistanceFromMean => "agent-distance-from-mean",
            Self::AgentNormalizedRank => "agent-normalized-rank",
        }
    }

    /// Signal capability this mode needs, if any.
    pub fn required_capability(self) -> Option<&'static str> {
        match self {
            Self::Global => None,
            Self::ZoneOfAgent => Some("locatable"),
            Self::Agent | Self::AgentDistanceFromMean | Self::AgentNormalizedRank => {
                Some("individualizable")
            }
        }
    }
}

impl std::fmt::Display for RequestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a looked-up value inside `validity` linearly onto `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub validity: Interval,
    pub score: Interval,
    #[serde(default)]
    pub description: String,
}

impl ScoreRange {
    pub fn new(validity: Interval, score: Interval, description: impl Into<String>) -> Self {
        Self {
            validity,
            score,
            description: description.into(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.validity.contains(value)
    }

    /// Interpolated score for `value`, clamped to the score bounds.
    pub fn score_for(&self, value: f64) -> f64 {
        interpolate(&self.validity, &self.score, value)
    }
}

/// Maps a modifier value inside `validity` to a multiplier and flat offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierRange {
    pub validity: Interval,
    #[serde(default = "one")]
    pub multiplier: f64,
    #[serde(default)]
    pub offset: f64,
}

fn one() -> f64 {
    1.0
}

impl ModifierRange {
    pub fn new(validity: Interval, multiplier: f64, offset: f64) -> Self {
        Self {
            validity,
            multiplier,
            offset,
        }
    }
}

/// One clause of a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Hard veto: the agent must pass the filter or the rule scores 0.
    FilterGate(FilterSpec),
    /// Read a signal and map it through the rule's score ranges.
    SignalLookup { signal: String, mode: RequestMode },
    /// Read an external modifier and fold its range into multiplier/offset.
    ModifierLookup { key: String, ranges: Vec<ModifierRange> },
}

/// What a rule contributes to: a whole task category or one sub-task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTarget {
    Category(String),
    SubTask(String),
}

impl std::fmt::Display for TaskTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category(name) => write!(f, "category:{name}"),
            Self::SubTask(name) => write!(f, "sub-task:{name}"),
        }
    }
}

/// A named scoring unit. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    pub name: String,
    /// Re-evaluated on the urgent cadence too.
    pub urgent: bool,
    pub conditions: Vec<Condition>,
    pub ranges: Vec<ScoreRange>,
    pub targets: Vec<TaskTarget>,
    /// Base score before any range matches; the engine's neutral score when unset.
    pub default_score: Option<f64>,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            urgent: false,
            conditions: Vec::new(),
            ranges: Vec::new(),
            targets: Vec::new(),
            default_score: None,
        }
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn gate(self, filter: FilterSpec) -> Self {
        self.with_condition(Condition::FilterGate(filter))
    }

    pub fn lookup(self, signal: impl Into<String>, mode: RequestMode) -> Self {
        self.with_condition(Condition::SignalLookup {
            signal: signal.into(),
            mode,
        })
    }

    pub fn modifier(self, key: impl Into<String>, ranges: Vec<ModifierRange>) -> Self {
        self.with_condition(Condition::ModifierLookup {
            key: key.into(),
            ranges,
        })
    }

    pub fn with_range(mut self, range: ScoreRange) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn targeting(mut self, target: TaskTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_default_score(mut self, score: f64) -> Self {
        self.default_score = Some(score);
        self
    }

    /// First range whose validity interval contains `value`.
    pub fn range_for(&self, value: f64) -> Option<&ScoreRange> {
        self.ranges.iter().find(|r| r.contains(value))
    }

    /// Names of every signal this rule reads.
    pub fn signal_refs(&self) -> impl Iterator<Item = (&str, RequestMode)> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::SignalLookup { signal, mode } => Some((signal.as_str(), *mode)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_range_wins() {
        let rule = RuleDefinition::new("r")
            .with_range(ScoreRange::new(Interval::new(0.0, 10.0), Interval::point(5.0), "low"))
            .with_range(ScoreRange::new(Interval::new(5.0, 20.0), Interval::point(9.0), "high"));
        assert_eq!(rule.range_for(7.0).unwrap().description, "low");
        assert_eq!(rule.range_for(15.0).unwrap().description, "high");
        assert!(rule.range_for(25.0).is_none());
    }

    #[test]
    fn score_range_interpolates() {
        let r = ScoreRange::new(Interval::new(1.0, 2.0), Interval::new(10.0, 20.0), "");
        assert_eq!(r.score_for(1.5), 15.0);
        assert_eq!(r.score_for(5.0), 20.0);
    }

    #[test]
    fn request_mode_capabilities() {
        assert_eq!(RequestMode::Global.required_capability(), None);
        assert_eq!(RequestMode::ZoneOfAgent.required_capability(), Some("locatable"));
        assert_eq!(
            RequestMode::AgentNormalizedRank.required_capability(),
            Some("individualizable")
        );
    }

    #[test]
    fn signal_refs_lists_lookups_in_order() {
        let rule = RuleDefinition::new("r")
            .gate(FilterSpec::any())
            .lookup("a", RequestMode::Global)
            .modifier("k", vec![])
            .lookup("b", RequestMode::Agent);
        let refs: Vec<_> = rule.signal_refs().collect();
        assert_eq!(refs, vec![("a", RequestMode::Global), ("b", RequestMode::Agent)]);
    }

    #[test]
    fn task_target_deserializes_from_table() {
        let t: TaskTarget = toml::from_str("sub_task = \"CookMeals\"").unwrap();
        assert_eq!(t, TaskTarget::SubTask("CookMeals".into()));
    }
}
