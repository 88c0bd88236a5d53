//! Definition registry: signals, rules, categories and affinity bonuses.
//!
//! Definitions are loaded once from a TOML document with four arrays of
//! tables (`[[signal]]`, `[[rule]]`, `[[category]]`, `[[affinity_bonus]]`).
//! Each entry is deserialized and validated on its own, so one bad entry
//! never prevents the others from loading. Problems are logged, collected
//! in [`DefinitionRegistry::issues`], and the offending definition is
//! flagged invalid: it evaluates to a neutral zero.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{DefinitionError, DefinitionResult};
use crate::filter::FilterSpec;
use crate::interval::{Interval, IntervalRepr};
use crate::ranking::{AffinityBonus, CategoryPlan, Passion, TaskCategory};
use crate::rule::{Condition, ModifierRange, RequestMode, RuleDefinition, ScoreRange, TaskTarget};
use crate::signal::{Aggregation, SignalDefinition, SignalSource};

// ── Raw TOML model ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    signal: Vec<toml::Value>,
    #[serde(default)]
    rule: Vec<toml::Value>,
    #[serde(default)]
    category: Vec<toml::Value>,
    #[serde(default)]
    affinity_bonus: Vec<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawSignal {
    #[serde(default)]
    name: String,
    source: Option<SignalSource>,
    #[serde(default)]
    aggregation: Aggregation,
    #[serde(default)]
    filter: FilterSpec,
    #[serde(default)]
    locatable: bool,
    #[serde(default)]
    individualizable: bool,
    #[serde(default)]
    urgent: bool,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    name: String,
    #[serde(default)]
    urgent: bool,
    #[serde(default)]
    conditions: Vec<RawCondition>,
    #[serde(default)]
    ranges: Vec<RawScoreRange>,
    #[serde(default)]
    targets: Vec<TaskTarget>,
    #[serde(default)]
    default_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawCondition {
    FilterGate {
        #[serde(default)]
        filter: FilterSpec,
    },
    SignalLookup {
        #[serde(default)]
        signal: String,
        #[serde(default)]
        mode: RequestMode,
    },
    ModifierLookup {
        #[serde(default)]
        key: String,
        #[serde(default)]
        ranges: Vec<RawModifierRange>,
    },
}

#[derive(Debug, Deserialize)]
struct RawScoreRange {
    validity: Option<IntervalRepr>,
    score: Option<IntervalRepr>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RawModifierRange {
    validity: Option<IntervalRepr>,
    #[serde(default = "one")]
    multiplier: f64,
    #[serde(default)]
    offset: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct RawBonus {
    #[serde(default)]
    name: String,
    passion: Option<Passion>,
    score: Option<i32>,
    #[serde(default)]
    description: String,
}

fn entry_name(value: &toml::Value) -> Option<String> {
    value
        .get("name")
        .and_then(toml::Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
}

// ── Registry ────────────────────────────────────────────────────────────

/// Counts shown by `rankwork validate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrySummary {
    pub signals: usize,
    pub rules: usize,
    pub categories: usize,
    pub affinity_bonuses: usize,
    pub invalid: usize,
}

/// Immutable store of every loaded definition.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    signals: Vec<SignalDefinition>,
    signal_index: HashMap<String, usize>,
    rules: Vec<RuleDefinition>,
    rule_index: HashMap<String, usize>,
    categories: Vec<TaskCategory>,
    bonuses: Vec<AffinityBonus>,
    plans: Vec<CategoryPlan>,
    invalid_signals: HashSet<String>,
    invalid_rules: HashSet<String>,
    issues: Vec<DefinitionError>,
}

impl DefinitionRegistry {
    /// Load definitions from a TOML file.
    pub fn load(path: &Path) -> DefinitionResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let registry = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            signals = registry.signals.len(),
            rules = registry.rules.len(),
            issues = registry.issues.len(),
            "definitions loaded"
        );
        Ok(registry)
    }

    /// Parse a TOML document. Fails only when the document itself is not valid TOML.
    pub fn from_toml_str(text: &str) -> DefinitionResult<Self> {
        let doc: RawDocument = toml::from_str(text).map_err(|e| DefinitionError::Parse {
            message: e.to_string(),
        })?;

        let mut registry = Self::default();
        let categories = registry.parse_entries::<TaskCategory>("category", doc.category);
        let bonuses = registry.parse_entries::<RawBonus>("affinity_bonus", doc.affinity_bonus);
        let signals = registry.parse_entries::<RawSignal>("signal", doc.signal);
        let rules = registry.parse_entries::<RawRule>("rule", doc.rule);

        for category in categories.into_iter().flatten() {
            registry.add_category(category);
        }
        for raw in bonuses.into_iter().flatten() {
            registry.add_raw_bonus(raw);
        }
        for entry in signals {
            match entry {
                Ok(raw) => registry.add_raw_signal(raw),
                Err(name) => registry.claim_broken("signal", name),
            }
        }
        for entry in rules {
            match entry {
                Ok(raw) => {
                    if let Some((rule, valid)) = registry.compile_rule(raw) {
                        registry.add_rule(rule, valid);
                    }
                }
                Err(name) => registry.claim_broken("rule", name),
            }
        }
        registry.build_plans();
        Ok(registry)
    }

    /// Build a registry from already-constructed definitions, with the same validation.
    pub fn from_parts(
        signals: Vec<SignalDefinition>,
        rules: Vec<RuleDefinition>,
        categories: Vec<TaskCategory>,
        bonuses: Vec<AffinityBonus>,
    ) -> Self {
        let mut registry = Self::default();
        for category in categories {
            registry.add_category(category);
        }
        for bonus in bonuses {
            registry.add_bonus(bonus);
        }
        for signal in signals {
            registry.add_signal(signal);
        }
        for rule in rules {
            let valid = registry.validate_rule(&rule);
            registry.add_rule(rule, valid);
        }
        registry.build_plans();
        registry
    }

    // ── Accessors ───────────────────────────────────────────────────────

    /// Every signal definition, valid or not, in load order.
    pub fn signals(&self) -> &[SignalDefinition] {
        &self.signals
    }

    pub fn signal(&self, name: &str) -> Option<&SignalDefinition> {
        self.signal_index.get(name).map(|&i| &self.signals[i])
    }

    pub fn is_valid_signal(&self, name: &str) -> bool {
        self.signal_index.contains_key(name) && !self.invalid_signals.contains(name)
    }

    /// Every rule definition, valid or not, in load order.
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&RuleDefinition> {
        self.rule_index.get(name).map(|&i| &self.rules[i])
    }

    pub fn is_valid_rule(&self, name: &str) -> bool {
        self.rule_index.contains_key(name) && !self.invalid_rules.contains(name)
    }

    /// Rules that passed validation, in load order.
    pub fn valid_rules(&self) -> impl Iterator<Item = &RuleDefinition> + Clone {
        self.rules
            .iter()
            .filter(|r| !self.invalid_rules.contains(&r.name))
    }

    /// Valid rules flagged urgent.
    pub fn urgent_rules(&self) -> impl Iterator<Item = &RuleDefinition> + Clone {
        self.valid_rules().filter(|r| r.urgent)
    }

    pub fn categories(&self) -> &[TaskCategory] {
        &self.categories
    }

    pub fn affinity_bonuses(&self) -> &[AffinityBonus] {
        &self.bonuses
    }

    /// Per-category rule lists, resolved at load time.
    pub fn plans(&self) -> &[CategoryPlan] {
        &self.plans
    }

    /// Every problem found while loading.
    pub fn issues(&self) -> &[DefinitionError] {
        &self.issues
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            signals: self.signals.len(),
            rules: self.rules.len(),
            categories: self.categories.len(),
            affinity_bonuses: self.bonuses.len(),
            invalid: self.invalid_signals.len() + self.invalid_rules.len(),
        }
    }

    // ── Loading ─────────────────────────────────────────────────────────

    fn flag(&mut self, issue: DefinitionError) {
        tracing::error!(error = %issue, "invalid definition");
        self.issues.push(issue);
    }

    /// Deserialize each entry on its own. A failed entry is reported and
    /// comes back as `Err` carrying its name, if it had one.
    fn parse_entries<T: serde::de::DeserializeOwned>(
        &mut self,
        kind: &'static str,
        values: Vec<toml::Value>,
    ) -> Vec<Result<T, Option<String>>> {
        values
            .into_iter()
            .map(|value| {
                let name = entry_name(&value);
                value.try_into::<T>().map_err(|e| {
                    self.flag(DefinitionError::Parse {
                        message: format!("{kind} '{}': {e}", name.as_deref().unwrap_or("(unnamed)")),
                    });
                    name
                })
            })
            .collect()
    }

    /// A broken signal or rule still claims its name, unless an earlier
    /// definition already holds it.
    fn claim_broken(&mut self, kind: &'static str, name: Option<String>) {
        let Some(name) = name else {
            return;
        };
        let (index, invalid) = match kind {
            "signal" => (&self.signal_index, &mut self.invalid_signals),
            _ => (&self.rule_index, &mut self.invalid_rules),
        };
        if index.contains_key(&name) || invalid.contains(&name) {
            return self.flag(DefinitionError::DuplicateName { kind, name });
        }
        invalid.insert(name);
    }

    fn add_category(&mut self, category: TaskCategory) {
        if category.name.trim().is_empty() {
            return self.flag(DefinitionError::MissingField {
                kind: "category",
                name: "(unnamed)".into(),
                field: "name",
            });
        }
        if self.categories.iter().any(|c| c.name == category.name) {
            return self.flag(DefinitionError::DuplicateName {
                kind: "category",
                name: category.name,
            });
        }
        self.categories.push(category);
    }

    fn add_raw_bonus(&mut self, raw: RawBonus) {
        let name = if raw.name.trim().is_empty() { "(unnamed)".to_string() } else { raw.name.clone() };
        let Some(passion) = raw.passion else {
            return self.flag(DefinitionError::MissingField {
                kind: "affinity_bonus",
                name,
                field: "passion",
            });
        };
        let Some(score) = raw.score else {
            return self.flag(DefinitionError::MissingField {
                kind: "affinity_bonus",
                name,
                field: "score",
            });
        };
        self.add_bonus(AffinityBonus {
            name: raw.name,
            passion,
            score,
            description: raw.description,
        });
    }

    fn add_bonus(&mut self, bonus: AffinityBonus) {
        if bonus.name.trim().is_empty() {
            return self.flag(DefinitionError::MissingField {
                kind: "affinity_bonus",
                name: "(unnamed)".into(),
                field: "name",
            });
        }
        if self.bonuses.iter().any(|b| b.name == bonus.name) {
            return self.flag(DefinitionError::DuplicateName {
                kind: "affinity_bonus",
                name: bonus.name,
            });
        }
        self.bonuses.push(bonus);
    }

    fn add_raw_signal(&mut self, raw: RawSignal) {
        let Some(source) = raw.source else {
            let name = (!raw.name.trim().is_empty()).then(|| raw.name.clone());
            self.flag(DefinitionError::MissingField {
                kind: "signal",
                name: raw.name,
                field: "source",
            });
            return self.claim_broken("signal", name);
        };
        self.add_signal(SignalDefinition {
            name: raw.name,
            source,
            aggregation: raw.aggregation,
            filter: raw.filter,
            locatable: raw.locatable,
            individualizable: raw.individualizable,
            urgent: raw.urgent,
        });
    }

    fn add_signal(&mut self, signal: SignalDefinition) {
        if signal.name.trim().is_empty() {
            return self.flag(DefinitionError::MissingField {
                kind: "signal",
                name: "(unnamed)".into(),
                field: "name",
            });
        }
        if self.signal_index.contains_key(&signal.name) || self.invalid_signals.contains(&signal.name) {
            return self.flag(DefinitionError::DuplicateName {
                kind: "signal",
                name: signal.name,
            });
        }
        if let Some(field) = signal.source.missing_field() {
            self.invalid_signals.insert(signal.name.clone());
            self.flag(DefinitionError::MissingField {
                kind: "signal",
                name: signal.name.clone(),
                field,
            });
        }
        let kind = signal.source.kind();
        if signal.individualizable && !kind.is_agent_sourced() {
            tracing::warn!(signal = %signal.name, %kind, "individualizable has no effect for this source kind");
        }
        if signal.locatable && !kind.is_locatable() {
            tracing::warn!(signal = %signal.name, %kind, "locatable has no effect for this source kind");
        }
        for tag in signal.filter.unknown_tags() {
            tracing::warn!(signal = %signal.name, tag, "filter uses an unknown tag");
        }
        self.signal_index.insert(signal.name.clone(), self.signals.len());
        self.signals.push(signal);
    }

    /// Compile a raw rule. Intervals that fail to parse drop their range and flag the rule.
    fn compile_rule(&mut self, raw: RawRule) -> Option<(RuleDefinition, bool)> {
        if raw.name.trim().is_empty() {
            self.flag(DefinitionError::MissingField {
                kind: "rule",
                name: "(unnamed)".into(),
                field: "name",
            });
            return None;
        }
        let mut valid = true;
        let name = raw.name;

        let mut conditions = Vec::with_capacity(raw.conditions.len());
        for condition in raw.conditions {
            match condition {
                RawCondition::FilterGate { filter } => conditions.push(Condition::FilterGate(filter)),
                RawCondition::SignalLookup { signal, mode } => {
                    conditions.push(Condition::SignalLookup { signal, mode })
                }
                RawCondition::ModifierLookup { key, ranges } => {
                    let mut compiled = Vec::with_capacity(ranges.len());
                    for range in ranges {
                        match self.compile_interval(&name, "validity", range.validity.as_ref()) {
                            Some(validity) => {
                                compiled.push(ModifierRange::new(validity, range.multiplier, range.offset))
                            }
                            None => valid = false,
                        }
                    }
                    conditions.push(Condition::ModifierLookup { key, ranges: compiled });
                }
            }
        }

        let mut ranges = Vec::with_capacity(raw.ranges.len());
        for range in raw.ranges {
            let validity = self.compile_interval(&name, "validity", range.validity.as_ref());
            let score = self.compile_interval(&name, "score", range.score.as_ref());
            match (validity, score) {
                (Some(validity), Some(score)) => {
                    ranges.push(ScoreRange::new(validity, score, range.description))
                }
                _ => valid = false,
            }
        }

        let rule = RuleDefinition {
            name,
            urgent: raw.urgent,
            conditions,
            ranges,
            targets: raw.targets,
            default_score: raw.default_score,
        };
        let checked = self.validate_rule(&rule);
        Some((rule, valid && checked))
    }

    fn compile_interval(&mut self, rule: &str, field: &'static str, repr: Option<&IntervalRepr>) -> Option<Interval> {
        let Some(repr) = repr else {
            self.flag(DefinitionError::MissingField {
                kind: "rule",
                name: rule.to_string(),
                field,
            });
            return None;
        };
        let interval = Interval::from_repr(repr);
        if interval.is_none() {
            self.flag(DefinitionError::InvalidInterval {
                kind: "rule",
                name: rule.to_string(),
                text: repr.to_string(),
            });
        }
        interval
    }

    /// Check references, targets and capabilities. Returns whether the rule is valid.
    fn validate_rule(&mut self, rule: &RuleDefinition) -> bool {
        let mut valid = true;
        if rule.targets.is_empty() {
            self.flag(DefinitionError::NoTargets {
                name: rule.name.clone(),
            });
            valid = false;
        }
        for target in &rule.targets {
            let (level, known) = match target {
                TaskTarget::Category(name) => ("category", self.categories.iter().any(|c| &c.name == name)),
                TaskTarget::SubTask(name) => (
                    "sub-task",
                    self.categories.iter().any(|c| c.sub_tasks.contains(name)),
                ),
            };
            if !known {
                let target = match target {
                    TaskTarget::Category(n) | TaskTarget::SubTask(n) => n.clone(),
                };
                self.flag(DefinitionError::UnknownTarget {
                    rule: rule.name.clone(),
                    level,
                    target,
                });
                valid = false;
            }
        }

        for condition in &rule.conditions {
            match condition {
                Condition::SignalLookup { signal, .. } if signal.trim().is_empty() => {
                    self.flag(DefinitionError::MissingField {
                        kind: "rule",
                        name: rule.name.clone(),
                        field: "signal",
                    });
                    valid = false;
                }
                Condition::ModifierLookup { key, .. } if key.trim().is_empty() => {
                    self.flag(DefinitionError::MissingField {
                        kind: "rule",
                        name: rule.name.clone(),
                        field: "key",
                    });
                    valid = false;
                }
                Condition::FilterGate(filter) => {
                    for tag in filter.unknown_tags() {
                        tracing::warn!(rule = %rule.name, tag, "filter gate uses an unknown tag");
                    }
                }
                _ => {}
            }
        }

        for (signal, mode) in rule.signal_refs() {
            if signal.trim().is_empty() {
                continue;
            }
            let capability = mode.required_capability();
            let issue = match self.signal(signal) {
                None if self.invalid_signals.contains(signal) => None,
                None => Some(DefinitionError::UnknownSignal {
                    rule: rule.name.clone(),
                    signal: signal.to_string(),
                }),
                Some(def) => match capability {
                    Some("locatable") if !def.produces_zones() => Some(capability_mismatch(rule, signal, mode, "locatable")),
                    Some("individualizable") if !def.produces_agents() => {
                        Some(capability_mismatch(rule, signal, mode, "individualizable"))
                    }
                    _ => None,
                },
            };
            if let Some(issue) = issue {
                self.flag(issue);
                valid = false;
            }
        }
        valid
    }

    fn add_rule(&mut self, rule: RuleDefinition, valid: bool) {
        if self.rule_index.contains_key(&rule.name) || self.invalid_rules.contains(&rule.name) {
            return self.flag(DefinitionError::DuplicateName {
                kind: "rule",
                name: rule.name,
            });
        }
        if !valid {
            self.invalid_rules.insert(rule.name.clone());
        }
        self.rule_index.insert(rule.name.clone(), self.rules.len());
        self.rules.push(rule);
    }

    fn build_plans(&mut self) {
        let mut plans: Vec<CategoryPlan> = self.categories.iter().cloned().map(CategoryPlan::new).collect();
        for rule in self.rules.iter().filter(|r| !self.invalid_rules.contains(&r.name)) {
            for target in &rule.targets {
                match target {
                    TaskTarget::Category(name) => {
                        for plan in plans.iter_mut().filter(|p| p.name() == name) {
                            plan.add_category_rule(rule.name.clone());
                        }
                    }
                    TaskTarget::SubTask(name) => {
                        for plan in plans.iter_mut() {
                            plan.add_sub_task_rule(name, rule.name.clone());
                        }
                    }
                }
            }
        }
        self.plans = plans;
    }
}

fn capability_mismatch(rule: &RuleDefinition, signal: &str, mode: RequestMode, capability: &'static str) -> DefinitionError {
    DefinitionError::CapabilityMismatch {
        rule: rule.name.clone(),
        signal: signal.to_string(),
        mode: mode.to_string(),
        capability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SourceKind;

    const DEFS: &str = r#"
[[category]]
name = "Cooking"
sub_tasks = ["CookMeals", "Butcher"]
skills = ["Cooking"]

[[category]]
name = "Cleaning"

[[affinity_bonus]]
name = "major_passion"
passion = "major"
score = 20
description = "burning passion"

[[signal]]
name = "meals"
aggregation = "sum"
source = { kind = "object-count", object_kinds = ["MealSimple"] }
filter = { include = [["in_storage"]] }

[[signal]]
name = "cooking_skill"
individualizable = true
source = { kind = "agent-attribute", attribute = "Cooking" }

[[rule]]
name = "low_meals"
urgent = true
targets = [{ sub_task = "CookMeals" }, { sub_task = "Butcher" }]
conditions = [
  { type = "filter-gate", filter = { include = [["!incapacitated"]] } },
  { type = "signal-lookup", signal = "meals", mode = "global" },
]

[[rule.ranges]]
validity = "0~5"
score = "30~10"
description = "few meals stocked"

[[rule.ranges]]
validity = "5~"
score = 0

[[rule]]
name = "good_cook"
targets = [{ category = "Cooking" }]
conditions = [{ type = "signal-lookup", signal = "cooking_skill", mode = "agent-normalized-rank" }]
ranges = [{ validity = { min = -1, max = 1 }, score = "-10~10" }]
"#;

    #[test]
    fn loads_a_valid_document() {
        let reg = DefinitionRegistry::from_toml_str(DEFS).unwrap();
        assert!(reg.issues().is_empty(), "{:?}", reg.issues());
        assert_eq!(reg.signals().len(), 2);
        assert_eq!(reg.rules().len(), 2);
        assert_eq!(reg.signal("cooking_skill").unwrap().source.kind(), SourceKind::AgentAttribute);

        let low = reg.rule("low_meals").unwrap();
        assert!(low.urgent);
        assert_eq!(low.ranges[0].score, Interval::new(30.0, 10.0));
        assert_eq!(low.ranges[1].validity, Interval::new(5.0, f64::INFINITY));
        assert_eq!(reg.urgent_rules().count(), 1);

        let cooking = &reg.plans()[0];
        assert_eq!(cooking.sub_task_rules[0].1, vec!["low_meals".to_string()]);
        assert_eq!(cooking.sub_task_rules[1].1, vec!["low_meals".to_string()]);
        assert_eq!(cooking.category_rules, vec!["good_cook".to_string()]);
        assert_eq!(reg.affinity_bonuses()[0].score, 20);
    }

    #[test]
    fn bad_entries_do_not_stop_loading() {
        let reg = DefinitionRegistry::from_toml_str(
            r#"
[[category]]
name = "Cooking"

[[signal]]
name = "skill"
source = { kind = "agent-attribute" }

[[signal]]
name = "mystery"
source = { kind = "tea-leaves" }

[[signal]]
name = "meals"
source = { kind = "object-count" }

[[rule]]
name = "no_targets"
conditions = [{ type = "signal-lookup", signal = "meals" }]

[[rule]]
name = "zone_of_global"
targets = [{ category = "Cooking" }]
conditions = [{ type = "signal-lookup", signal = "meals", mode = "zone-of-agent" }]

[[rule]]
name = "ghost"
targets = [{ category = "Laundry" }]
conditions = [{ type = "signal-lookup", signal = "nope" }]

[[rule]]
name = "bad_interval"
targets = [{ category = "Cooking" }]
ranges = [{ validity = "a~b", score = 1 }]

[[rule]]
name = "fine"
targets = [{ category = "Cooking" }]
default_score = 2
"#,
        )
        .unwrap();

        let issues = reg.issues();
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::MissingField { field: "attribute", .. })));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::Parse { message } if message.contains("mystery"))));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::NoTargets { name } if name == "no_targets")));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::CapabilityMismatch { capability: "locatable", .. })));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::UnknownTarget { level: "category", .. })));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::UnknownSignal { signal, .. } if signal == "nope")));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::InvalidInterval { .. })));

        assert!(!reg.is_valid_signal("skill"));
        assert!(reg.is_valid_signal("meals"));
        assert!(reg.is_valid_rule("fine"));
        assert!(!reg.is_valid_rule("bad_interval"));
        assert_eq!(reg.valid_rules().count(), 1);
        assert_eq!(reg.plans()[0].category_rules, vec!["fine".to_string()]);
        assert_eq!(reg.summary().invalid, 2 + 4);
    }

    #[test]
    fn first_definition_wins_on_duplicates() {
        let reg = DefinitionRegistry::from_toml_str(
            r#"
[[signal]]
name = "meals"
source = { kind = "object-count", object_kinds = ["MealSimple"] }

[[signal]]
name = "meals"
source = { kind = "agent-count" }
"#,
        )
        .unwrap();
        assert_eq!(reg.signals().len(), 1);
        assert_eq!(reg.signal("meals").unwrap().source.kind(), SourceKind::ObjectCount);
        assert!(matches!(reg.issues()[0], DefinitionError::DuplicateName { kind: "signal", .. }));
    }

    #[test]
    fn broken_duplicate_does_not_invalidate_the_first() {
        let reg = DefinitionRegistry::from_toml_str(
            r#"
[[category]]
name = "Cooking"

[[signal]]
name = "meals"
source = { kind = "object-count" }

[[signal]]
name = "meals"

[[rule]]
name = "fine"
targets = [{ category = "Cooking" }]
default_score = 2

[[rule]]
name = "fine"
targets = "oops"
"#,
        )
        .unwrap();
        assert!(reg.is_valid_rule("fine"));
        assert!(reg.is_valid_signal("meals"));
        assert_eq!(reg.plans()[0].category_rules, vec!["fine".to_string()]);

        let issues = reg.issues();
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::Parse { message } if message.contains("fine"))));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::DuplicateName { kind: "rule", name } if name == "fine")));
        assert!(issues.iter().any(|e| matches!(e, DefinitionError::DuplicateName { kind: "signal", name } if name == "meals")));
        assert_eq!(reg.summary().invalid, 0);
    }

    #[test]
    fn broken_first_definition_keeps_its_name() {
        let reg = DefinitionRegistry::from_toml_str(
            r#"
[[signal]]
name = "meals"
source = { kind = "tea-leaves" }

[[signal]]
name = "meals"
source = { kind = "object-count" }
"#,
        )
        .unwrap();
        assert!(!reg.is_valid_signal("meals"));
        assert!(reg.signals().is_empty());
        assert!(reg
            .issues()
            .iter()
            .any(|e| matches!(e, DefinitionError::DuplicateName { kind: "signal", name } if name == "meals")));
    }

    #[test]
    fn unparsable_document_is_an_error() {
        assert!(matches!(
            DefinitionRegistry::from_toml_str("[[signal]\nname = "),
            Err(DefinitionError::Parse { .. })
        ));
    }

    #[test]
    fn from_parts_validates_like_toml() {
        let reg = DefinitionRegistry::from_parts(
            vec![SignalDefinition::new("pawns", SignalSource::AgentCount)],
            vec![
                RuleDefinition::new("crowded")
                    .lookup("pawns", RequestMode::Agent)
                    .targeting(TaskTarget::Category("Cooking".into())),
            ],
            vec![TaskCategory::new("Cooking")],
            vec![],
        );
        assert!(matches!(
            reg.issues()[0],
            DefinitionError::CapabilityMismatch { capability: "individualizable", .. }
        ));
        assert!(!reg.is_valid_rule("crowded"));
    }
}
