//! The world query surface consumed by the engine.
//!
//! The host simulation owns the world; this crate only reads it through the
//! [`World`] trait and writes results back through a [`PrioritySink`].
//! [`WorldSnapshot`] is a plain in-memory world that the CLI, tests and
//! benchmarks load from JSON.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};
use crate::ranking::{Passion, PriorityLevel};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier of an agent (a worker whose priorities are ranked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent:{}", self.0)
    }
}

/// Stable identifier of a world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

/// Stable identifier of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u64);

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "zone:{}", self.0)
    }
}

/// Key of a per-zone breakdown.
///
/// `Unscoped` merges members with no zone and members whose zone is
/// classified as not meaningful for grouping (see [`ZoneKind::is_unscoped`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneKey {
    Unscoped,
    Zone(ZoneId),
}

impl ZoneKey {
    /// Resolve the breakdown key for a member located in `zone`.
    pub fn resolve(world: &dyn World, zone: Option<ZoneId>) -> Self {
        match zone.and_then(|id| world.zone(id)) {
            Some(z) if !z.kind.is_unscoped() => Self::Zone(z.id),
            _ => Self::Unscoped,
        }
    }
}

impl std::fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unscoped => f.write_str("unscoped"),
            Self::Zone(id) => write!(f, "{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// Classification of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneKind {
    Room,
    Storage,
    Growing,
    Outdoors,
}

impl ZoneKind {
    /// Zones of this kind are grouped under [`ZoneKey::Unscoped`].
    pub fn is_unscoped(self) -> bool {
        matches!(self, Self::Outdoors)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Storage => "storage",
            Self::Growing => "growing",
            Self::Outdoors => "outdoors",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub label: String,
    pub kind: ZoneKind,
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// Construction state of a blueprint or frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Construction {
    pub work_done: f64,
    pub work_total: f64,
}

impl Construction {
    /// Fraction of work still to do, in [0, 1].
    pub fn remaining_ratio(&self) -> f64 {
        if self.work_total <= 0.0 {
            return 0.0;
        }
        (1.0 - self.work_done / self.work_total).clamp(0.0, 1.0)
    }
}

/// A thing in the world: item stack, building, plant, blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: ObjectId,
    /// Definition name, e.g. `"MealSimple"`.
    pub def_name: String,
    /// Object class, e.g. `"item"`, `"building"`.
    #[serde(default)]
    pub kind: String,
    /// Thing categories, e.g. `["Foods", "MealsCooked"]`.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default = "one")]
    pub stack_count: u32,
    /// Hit points as a fraction of max.
    #[serde(default = "full")]
    pub hit_points: f64,
    #[serde(default)]
    pub zone: Option<ZoneId>,
    #[serde(default)]
    pub in_storage: bool,
    #[serde(default)]
    pub forbidden: bool,
    #[serde(default)]
    pub construction: Option<Construction>,
}

fn one() -> u32 {
    1
}

fn full() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Relationship of an agent to the player's faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Allegiance {
    Member,
    Prisoner,
    Slave,
    Guest,
    Neutral,
    Hostile,
}

impl Allegiance {
    pub fn label(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Prisoner => "prisoner",
            Self::Slave => "slave",
            Self::Guest => "guest",
            Self::Neutral => "neutral",
            Self::Hostile => "hostile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" | "colonist" => Some(Self::Member),
            "prisoner" => Some(Self::Prisoner),
            "slave" => Some(Self::Slave),
            "guest" => Some(Self::Guest),
            "neutral" => Some(Self::Neutral),
            "hostile" => Some(Self::Hostile),
            _ => None,
        }
    }
}

/// A worker whose task priorities the engine ranks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    #[serde(default = "default_race")]
    pub race: String,
    #[serde(default = "default_allegiance")]
    pub allegiance: Allegiance,
    #[serde(default)]
    pub zone: Option<ZoneId>,
    #[serde(default)]
    pub deceased: bool,
    #[serde(default)]
    pub incapacitated: bool,
    #[serde(default)]
    pub captive: bool,
    #[serde(default)]
    pub guest: bool,
    /// External "pause evaluation for this agent" flag. Consulted, not owned.
    #[serde(default)]
    pub paused: bool,
    /// Skills and stats by name.
    #[serde(default)]
    pub attributes: HashMap<String, f64>,
    /// Need levels in [0, 1] by name.
    #[serde(default)]
    pub needs: HashMap<String, f64>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub afflictions: Vec<String>,
    /// Passion per skill; absent skills have no passion.
    #[serde(default)]
    pub passions: HashMap<String, Passion>,
    /// Task categories this agent is incapable of.
    #[serde(default)]
    pub disabled_categories: HashSet<String>,
}

fn default_race() -> String {
    "human".into()
}

fn default_allegiance() -> Allegiance {
    Allegiance::Member
}

impl Agent {
    /// Create a healthy member agent with no attributes.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: AgentId(id),
            name: name.into(),
            race: default_race(),
            allegiance: Allegiance::Member,
            zone: None,
            deceased: false,
            incapacitated: false,
            captive: false,
            guest: false,
            paused: false,
            attributes: HashMap::new(),
            needs: HashMap::new(),
            traits: Vec::new(),
            afflictions: Vec::new(),
            passions: HashMap::new(),
            disabled_categories: HashSet::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_need(mut self, name: impl Into<String>, value: f64) -> Self {
        self.needs.insert(name.into(), value);
        self
    }

    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.push(name.into());
        self
    }

    pub fn with_passion(mut self, skill: impl Into<String>, passion: Passion) -> Self {
        self.passions.insert(skill.into(), passion);
        self
    }

    pub fn in_zone(mut self, zone: ZoneId) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Passion for a skill, [`Passion::None`] when absent.
    pub fn passion(&self, skill: &str) -> Passion {
        self.passions.get(skill).copied().unwrap_or(Passion::None)
    }
}

// ---------------------------------------------------------------------------
// World trait
// ---------------------------------------------------------------------------

/// Read-only access to the host simulation.
pub trait World {
    /// Current simulation tick.
    fn tick(&self) -> u64;

    /// All world objects.
    fn objects(&self) -> &[WorldObject];

    /// All agents.
    fn agents(&self) -> &[Agent];

    /// Look up an agent by id.
    fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents().iter().find(|a| a.id == id)
    }

    /// Look up a zone by id.
    fn zone(&self, id: ZoneId) -> Option<&Zone>;

    /// Whether a named environmental condition (e.g. "ToxicFallout") is active.
    fn condition_active(&self, condition: &str) -> bool;

    /// Current weather name.
    fn weather(&self) -> Option<&str>;
}

/// Receives priority levels assigned by the ranking step.
pub trait PrioritySink {
    fn apply(&mut self, agent: AgentId, category: &str, level: PriorityLevel);
}

/// A [`PrioritySink`] that records assignments in memory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssignedPriorities {
    pub levels: BTreeMap<AgentId, BTreeMap<String, PriorityLevel>>,
}

impl AssignedPriorities {
    pub fn get(&self, agent: AgentId, category: &str) -> Option<PriorityLevel> {
        self.levels.get(&agent)?.get(category).copied()
    }
}

impl PrioritySink for AssignedPriorities {
    fn apply(&mut self, agent: AgentId, category: &str, level: PriorityLevel) {
        self.levels
            .entry(agent)
            .or_default()
            .insert(category.to_string(), level);
    }
}

// ---------------------------------------------------------------------------
// In-memory snapshot
// ---------------------------------------------------------------------------

/// A self-contained world, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub objects: Vec<WorldObject>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub weather: Option<String>,
}

impl WorldSnapshot {
    /// Parse a snapshot from a JSON string.
    pub fn from_json(json: &str) -> WorldResult<Self> {
        serde_json::from_str(json).map_err(|e| WorldError::Parse {
            message: e.to_string(),
        })
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> WorldResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WorldError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn with_object(mut self, object: WorldObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_zone(mut self, id: u64, label: impl Into<String>, kind: ZoneKind) -> Self {
        self.zones.push(Zone {
            id: ZoneId(id),
            label: label.into(),
            kind,
        });
        self
    }

    /// Advance the clock by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

impl World for WorldSnapshot {
    fn tick(&self) -> u64 {
        self.tick
    }

    fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    fn agents(&self) -> &[Agent] {
        &self.agents
    }

    fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    fn condition_active(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c.eq_ignore_ascii_case(condition))
    }

    fn weather(&self) -> Option<&str> {
        self.weather.as_deref()
    }
}

impl WorldObject {
    /// A plain item stack, handy for building test worlds.
    pub fn item(id: u64, def_name: impl Into<String>, stack_count: u32) -> Self {
        Self {
            id: ObjectId(id),
            def_name: def_name.into(),
            kind: "item".into(),
            categories: Vec::new(),
            stack_count,
            hit_points: 1.0,
            zone: None,
            in_storage: false,
            forbidden: false,
            construction: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn in_zone(mut self, zone: ZoneId) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn stored(mut self) -> Self {
        self.in_storage = true;
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.forbidden = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldSnapshot {
        WorldSnapshot::default()
            .with_zone(1, "Kitchen", ZoneKind::Room)
            .with_zone(2, "Field", ZoneKind::Outdoors)
    }

    #[test]
    fn zone_key_remaps_outdoors_and_missing_zones() {
        let w = world();
        assert_eq!(ZoneKey::resolve(&w, Some(ZoneId(1))), ZoneKey::Zone(ZoneId(1)));
        assert_eq!(ZoneKey::resolve(&w, Some(ZoneId(2))), ZoneKey::Unscoped);
        assert_eq!(ZoneKey::resolve(&w, None), ZoneKey::Unscoped);
        // A zone id the world does not know about is unscoped too.
        assert_eq!(ZoneKey::resolve(&w, Some(ZoneId(99))), ZoneKey::Unscoped);
    }

    #[test]
    fn construction_remaining_ratio_is_clamped() {
        let c = Construction {
            work_done: 25.0,
            work_total: 100.0,
        };
        assert!((c.remaining_ratio() - 0.75).abs() < 1e-9);
        let over = Construction {
            work_done: 150.0,
            work_total: 100.0,
        };
        assert_eq!(over.remaining_ratio(), 0.0);
        let empty = Construction {
            work_done: 0.0,
            work_total: 0.0,
        };
        assert_eq!(empty.remaining_ratio(), 0.0);
    }

    #[test]
    fn snapshot_parses_minimal_json() {
        let json = r#"{
            "tick": 42,
            "agents": [{ "id": 1, "name": "Ada", "attributes": { "Cooking": 8 } }],
            "objects": [{ "id": 10, "def_name": "Steel", "stack_count": 75 }]
        }"#;
        let w = WorldSnapshot::from_json(json).unwrap();
        assert_eq!(w.tick(), 42);
        assert_eq!(w.agents()[0].allegiance, Allegiance::Member);
        assert_eq!(w.agents()[0].attributes["Cooking"], 8.0);
        assert_eq!(w.objects()[0].stack_count, 75);
        assert_eq!(w.objects()[0].hit_points, 1.0);
    }

    #[test]
    fn snapshot_rejects_malformed_json() {
        assert!(matches!(
            WorldSnapshot::from_json("{ not json"),
            Err(WorldError::Parse { .. })
        ));
    }

    #[test]
    fn assigned_priorities_records_levels() {
        let mut sink = AssignedPriorities::default();
        sink.apply(AgentId(1), "Cooking", PriorityLevel::Level(1));
        sink.apply(AgentId(1), "Cooking", PriorityLevel::Disabled);
        assert_eq!(sink.get(AgentId(1), "Cooking"), Some(PriorityLevel::Disabled));
        assert_eq!(sink.get(AgentId(2), "Cooking"), None);
    }

    #[test]
    fn conditions_match_case_insensitively() {
        let mut w = world();
        w.conditions.push("ToxicFallout".into());
        assert!(w.condition_active("toxicfallout"));
        assert!(!w.condition_active("Eclipse"));
    }
}
