//! Filter evaluation: pure predicates over world objects and agents.
//!
//! A [`FilterSpec`] holds include and exclude tag groups plus an optional
//! [`AgentFilter`]. Within a group every tag must match (AND); a candidate
//! matches a group list if it matches any group (OR). An empty include list
//! admits everything and an empty exclude list rejects nothing.
//!
//! Unknown tags never match. Each distinct unknown tag is warned about once
//! per [`FilterEvaluator`].

pub mod tag;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

use crate::world::{Agent, Allegiance, World, WorldObject, ZoneId, ZoneKey};

pub use tag::{Flag, Measure, Tag};

// ---------------------------------------------------------------------------
// Filter definitions
// ---------------------------------------------------------------------------

/// Agent status addressed by a [`StatusPredicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Deceased,
    Incapacitated,
    Captive,
    Guest,
    Paused,
}

/// `status` must equal `is`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPredicate {
    pub status: Status,
    #[serde(default = "yes")]
    pub is: bool,
}

fn yes() -> bool {
    true
}

impl StatusPredicate {
    pub fn is(status: Status) -> Self {
        Self { status, is: true }
    }

    pub fn is_not(status: Status) -> Self {
        Self { status, is: false }
    }

    fn holds(&self, agent: &Agent) -> bool {
        let actual = match self.status {
            Status::Deceased => agent.deceased,
            Status::Incapacitated => agent.incapacitated,
            Status::Captive => agent.captive,
            Status::Guest => agent.guest,
            Status::Paused => agent.paused,
        };
        actual == self.is
    }
}

/// Structured agent conditions, all AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentFilter {
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub allegiance: Option<Allegiance>,
    #[serde(default)]
    pub statuses: Vec<StatusPredicate>,
}

impl AgentFilter {
    fn matches(&self, agent: &Agent) -> bool {
        if let Some(race) = &self.race
            && !race.eq_ignore_ascii_case(&agent.race)
        {
            return false;
        }
        if let Some(allegiance) = self.allegiance
            && allegiance != agent.allegiance
        {
            return false;
        }
        self.statuses.iter().all(|p| p.holds(agent))
    }
}

/// A declarative population filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub include: Vec<Vec<Tag>>,
    #[serde(default)]
    pub exclude: Vec<Vec<Tag>>,
    /// Applies to agent candidates only.
    #[serde(default)]
    pub agent: Option<AgentFilter>,
}

impl FilterSpec {
    /// A filter that admits everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Add an include group.
    pub fn include(mut self, group: &[&str]) -> Self {
        self.include.push(group.iter().map(|t| Tag::parse(t)).collect());
        self
    }

    /// Add an exclude group.
    pub fn exclude(mut self, group: &[&str]) -> Self {
        self.exclude.push(group.iter().map(|t| Tag::parse(t)).collect());
        self
    }

    pub fn with_agent(mut self, agent: AgentFilter) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && self.agent.is_none()
    }

    /// Every unknown tag in this filter.
    pub fn unknown_tags(&self) -> impl Iterator<Item = &str> {
        self.include
            .iter()
            .chain(self.exclude.iter())
            .flatten()
            .filter_map(Tag::unknown)
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Something a filter can be tested against.
#[derive(Debug, Clone, Copy)]
pub enum Candidate<'a> {
    Object(&'a WorldObject),
    Agent(&'a Agent),
}

impl Candidate<'_> {
    fn zone(&self) -> Option<ZoneId> {
        match self {
            Self::Object(o) => o.zone,
            Self::Agent(a) => a.zone,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluates [`FilterSpec`]s. Holds only the set of already-reported
/// unknown tags, so evaluation is otherwise pure.
#[derive(Debug, Default)]
pub struct FilterEvaluator {
    reported: DashSet<String>,
}

impl FilterEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `candidate` passes `spec`.
    pub fn matches(&self, world: &dyn World, candidate: Candidate<'_>, spec: &FilterSpec) -> bool {
        if let (Some(filter), Candidate::Agent(agent)) = (&spec.agent, candidate)
            && !filter.matches(agent)
        {
            return false;
        }
        let included = spec.include.is_empty()
            || spec
                .include
                .iter()
                .any(|group| self.matches_group(world, candidate, group));
        if !included {
            return false;
        }
        !spec
            .exclude
            .iter()
            .any(|group| self.matches_group(world, candidate, group))
    }

    fn matches_group(&self, world: &dyn World, candidate: Candidate<'_>, group: &[Tag]) -> bool {
        group.iter().all(|tag| self.matches_tag(world, candidate, tag))
    }

    /// Whether a single tag holds for `candidate`.
    pub fn matches_tag(&self, world: &dyn World, candidate: Candidate<'_>, tag: &Tag) -> bool {
        if let Some(unknown) = tag.unknown() {
            self.report_unknown(unknown);
            return false;
        }
        match (tag, candidate) {
            (Tag::Not(inner), _) => !self.matches_tag(world, candidate, inner),
            (Tag::Flag(flag), _) => flag_holds(world, candidate, *flag),
            (Tag::ZoneKind(kind), _) => candidate
                .zone()
                .and_then(|id| world.zone(id))
                .is_some_and(|z| z.kind == *kind),
            (Tag::Def(name), Candidate::Object(o)) => o.def_name.eq_ignore_ascii_case(name),
            (Tag::Kind(kind), Candidate::Object(o)) => o.kind.eq_ignore_ascii_case(kind),
            (Tag::Category(cat), Candidate::Object(o)) => {
                o.categories.iter().any(|c| c.eq_ignore_ascii_case(cat))
            }
            (Tag::Race(race), Candidate::Agent(a)) => a.race.eq_ignore_ascii_case(race),
            (Tag::Allegiance(al), Candidate::Agent(a)) => a.allegiance == *al,
            (Tag::Trait(t), Candidate::Agent(a)) => a.traits.iter().any(|x| x.eq_ignore_ascii_case(t)),
            (Tag::Affliction(t), Candidate::Agent(a)) => {
                a.afflictions.iter().any(|x| x.eq_ignore_ascii_case(t))
            }
            (
                Tag::Measure {
                    measure,
                    comparison,
                },
                _,
            ) => {
                if !comparison.is_parsed() {
                    return true;
                }
                match measure_value(candidate, measure) {
                    Some(v) => comparison.passes(v),
                    None => false,
                }
            }
            // Tag addresses the other candidate type.
            _ => false,
        }
    }

    fn report_unknown(&self, tag: &str) {
        if self.reported.insert(tag.to_string()) {
            tracing::warn!(tag, "unknown filter tag, treating as non-matching");
        }
    }

    /// Unknown tags reported so far.
    pub fn reported_unknown_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.reported.iter().map(|t| t.key().clone()).collect();
        tags.sort();
        tags
    }
}

fn flag_holds(world: &dyn World, candidate: Candidate<'_>, flag: Flag) -> bool {
    match (flag, candidate) {
        (Flag::InStorage, Candidate::Object(o)) => o.in_storage,
        (Flag::Forbidden, Candidate::Object(o)) => o.forbidden,
        (Flag::UnderConstruction, Candidate::Object(o)) => o.construction.is_some(),
        (Flag::Deceased, Candidate::Agent(a)) => a.deceased,
        (Flag::Incapacitated, Candidate::Agent(a)) => a.incapacitated,
        (Flag::Captive, Candidate::Agent(a)) => a.captive,
        (Flag::Guest, Candidate::Agent(a)) => a.guest,
        (Flag::Paused, Candidate::Agent(a)) => a.paused,
        (Flag::Outdoors, _) => ZoneKey::resolve(world, candidate.zone()) == ZoneKey::Unscoped,
        _ => false,
    }
}

fn measure_value(candidate: Candidate<'_>, measure: &Measure) -> Option<f64> {
    match (measure, candidate) {
        (Measure::Stack, Candidate::Object(o)) => Some(f64::from(o.stack_count)),
        (Measure::HitPoints, Candidate::Object(o)) => Some(o.hit_points),
        (Measure::Attribute(name), Candidate::Agent(a)) => a.attributes.get(name).copied(),
        (Measure::Need(name), Candidate::Agent(a)) => a.needs.get(name).copied(),
        _ => None,
    }
}
