//! Signal definitions: what to measure, over which population, reduced how.

use serde::{Deserialize, Serialize};

use crate::filter::FilterSpec;

/// Where a signal's population comes from and what each member measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SignalSource {
    /// World objects of the named definitions (all objects when empty).
    /// Each member measures its stack size, or 1 when `use_stack` is off.
    ObjectCount {
        #[serde(default)]
        object_kinds: Vec<String>,
        #[serde(default = "yes")]
        use_stack: bool,
    },
    /// Agents; each member measures 1.
    AgentCount,
    /// Agents; each member measures the named attribute.
    AgentAttribute {
        #[serde(default)]
        attribute: String,
    },
    /// Agents; each member measures the named need level.
    AgentNeed {
        #[serde(default)]
        need: String,
    },
    /// Objects under construction; each member measures its remaining-work ratio.
    ConstructionProgress {
        #[serde(default)]
        object_kinds: Vec<String>,
    },
    /// 1 while the named environmental condition is active, else 0.
    EnvironmentCondition {
        #[serde(default)]
        condition: String,
    },
    /// 1 while the current weather is one of `weathers`, else 0.
    Weather {
        #[serde(default)]
        weathers: Vec<String>,
    },
    /// Agents; each member measures how many of its traits match `trait_name`.
    TraitCount {
        #[serde(default)]
        trait_name: String,
    },
    /// Agents; each member measures how many of its afflictions match.
    AfflictionCount {
        #[serde(default)]
        affliction: String,
    },
}

fn yes() -> bool {
    true
}

/// Data-free discriminant of [`SignalSource`], used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    ObjectCount,
    AgentCount,
    AgentAttribute,
    AgentNeed,
    ConstructionProgress,
    EnvironmentCondition,
    Weather,
    TraitCount,
    AfflictionCount,
}

impl SourceKind {
    pub const ALL: [SourceKind; 9] = [
        Self::ObjectCount,
        Self::AgentCount,
        Self::AgentAttribute,
        Self::AgentNeed,
        Self::ConstructionProgress,
        Self::EnvironmentCondition,
        Self::Weather,
        Self::TraitCount,
        Self::AfflictionCount,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ObjectCount => "object-count",
            Self::AgentCount => "agent-count",
            Self::AgentAttribute => "agent-attribute",
            Self::AgentNeed => "agent-need",
            Self::ConstructionProgress => "construction-progress",
            Self::EnvironmentCondition => "environment-condition",
            Self::Weather => "weather",
            Self::TraitCount => "trait-count",
            Self::AfflictionCount => "affliction-count",
        }
    }

    /// Populations made of agents can be broken down per agent.
    pub fn is_agent_sourced(self) -> bool {
        matches!(
            self,
            Self::AgentCount
                | Self::AgentAttribute
                | Self::AgentNeed
                | Self::TraitCount
                | Self::AfflictionCount
        )
    }

    /// Populations with a location can be broken down per zone.
    pub fn is_locatable(self) -> bool {
        !matches!(self, Self::EnvironmentCondition | Self::Weather)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl SignalSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::ObjectCount { .. } => SourceKind::ObjectCount,
            Self::AgentCount => SourceKind::AgentCount,
            Self::AgentAttribute { .. } => SourceKind::AgentAttribute,
            Self::AgentNeed { .. } => SourceKind::AgentNeed,
            Self::ConstructionProgress { .. } => SourceKind::ConstructionProgress,
            Self::EnvironmentCondition { .. } => SourceKind::EnvironmentCondition,
            Self::Weather { .. } => SourceKind::Weather,
            Self::TraitCount { .. } => SourceKind::TraitCount,
            Self::AfflictionCount { .. } => SourceKind::AfflictionCount,
        }
    }

    /// The first required field this source leaves empty.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            Self::AgentAttribute { attribute } if attribute.trim().is_empty() => Some("attribute"),
            Self::AgentNeed { need } if need.trim().is_empty() => Some("need"),
            Self::EnvironmentCondition { condition } if condition.trim().is_empty() => {
                Some("condition")
            }
            Self::Weather { weathers } if weathers.is_empty() => Some("weathers"),
            Self::TraitCount { trait_name } if trait_name.trim().is_empty() => Some("trait_name"),
            Self::AfflictionCount { affliction } if affliction.trim().is_empty() => {
                Some("affliction")
            }
            _ => None,
        }
    }
}

/// How member values reduce to one scalar. Every kind yields 0 when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    #[default]
    Sum,
    Average,
    Max,
    Min,
    Count,
    FirstOf,
}

impl Aggregation {
    pub fn reduce(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Self::Sum => values.iter().sum(),
            Self::Average => values.iter().sum::<f64>() / values.len() as f64,
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Count => values.len() as f64,
            Self::FirstOf => values[0],
        }
    }
}

/// A named signal. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    pub name: String,
    pub source: SignalSource,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub filter: FilterSpec,
    /// Also produce a per-zone breakdown.
    #[serde(default)]
    pub locatable: bool,
    /// Also produce a per-agent breakdown (agent-sourced kinds only).
    #[serde(default)]
    pub individualizable: bool,
    /// Re-evaluated on the urgent cadence too.
    #[serde(default)]
    pub urgent: bool,
}

impl SignalDefinition {
    pub fn new(name: impl Into<String>, source: SignalSource) -> Self {
        Self {
            name: name.into(),
            source,
            aggregation: Aggregation::Sum,
            filter: FilterSpec::any(),
            locatable: false,
            individualizable: false,
            urgent: false,
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn locatable(mut self) -> Self {
        self.locatable = true;
        self
    }

    pub fn individualizable(mut self) -> Self {
        self.individualizable = true;
        self
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    /// Whether a per-zone breakdown will be produced.
    pub fn produces_zones(&self) -> bool {
        self.locatable && self.source.kind().is_locatable()
    }

    /// Whether a per-agent breakdown will be produced.
    pub fn produces_agents(&self) -> bool {
        self.individualizable && self.source.kind().is_agent_sourced()
    }
}
