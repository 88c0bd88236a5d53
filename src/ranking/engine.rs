//! Category scoring, ranking and level assignment.
//!
//! For each agent every eligible category is scored from the agent's rule
//! scores: sub-task rules first in sub-task order, then category rules,
//! then at most one affinity bonus. A rule name counts once per category;
//! later occurrences go to the display-only duplicate list. Categories are
//! then stably sorted by total and bucketed into levels.
//!
//! All breakdowns of a cycle are computed and swapped in before any level
//! reaches the [`PrioritySink`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::rule::{RuleScore, RuleScoreTable, TaskTarget};
use crate::snapshot::SnapshotCell;
use crate::world::{Agent, AgentId, PrioritySink, World};

use super::category::{AffinityBonus, CategoryPlan, Passion};
use super::level::{LevelMode, PriorityLevel, rank_order};

// ---------------------------------------------------------------------------
// Breakdown types
// ---------------------------------------------------------------------------

/// One scored entry of a category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub rule: String,
    pub target: TaskTarget,
    pub score: i32,
    pub description: String,
}

/// How one category's total was reached for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub total: i64,
    /// Counted contributions, in evaluation order.
    pub contributions: Vec<Contribution>,
    /// Repeated rule names, shown but not summed.
    pub duplicates: Vec<Contribution>,
    pub affinity: Option<Contribution>,
    /// Position after sorting, 0 = highest total.
    pub rank: usize,
    pub level: PriorityLevel,
}

/// Every ranked category of one agent, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentBreakdown {
    pub agent: AgentId,
    pub tick: u64,
    pub categories: Vec<CategoryBreakdown>,
}

impl AgentBreakdown {
    pub fn category(&self, name: &str) -> Option<&CategoryBreakdown> {
        self.categories.iter().find(|c| c.category == name)
    }

    /// Category name to assigned level.
    pub fn levels(&self) -> impl Iterator<Item = (&str, PriorityLevel)> {
        self.categories.iter().map(|c| (c.category.as_str(), c.level))
    }
}

/// Breakdowns for every ranked agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BreakdownSet {
    pub tick: u64,
    pub agents: BTreeMap<AgentId, AgentBreakdown>,
}

impl BreakdownSet {
    pub fn agent(&self, id: AgentId) -> Option<&AgentBreakdown> {
        self.agents.get(&id)
    }

    pub fn category(&self, id: AgentId, category: &str) -> Option<&CategoryBreakdown> {
        self.agent(id)?.category(category)
    }
}

/// What one ranking pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankingSummary {
    pub ranked: usize,
    pub paused: usize,
    pub pruned: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Ranks categories per agent and keeps the last breakdowns for inspection.
#[derive(Debug, Default)]
pub struct RankingEngine {
    mode: LevelMode,
    breakdowns: SnapshotCell<BreakdownSet>,
}

impl RankingEngine {
    pub fn new(mode: LevelMode) -> Self {
        Self {
            mode,
            breakdowns: SnapshotCell::new(),
        }
    }

    pub fn mode(&self) -> LevelMode {
        self.mode
    }

    /// The breakdowns produced by the last pass.
    pub fn breakdowns(&self) -> std::sync::Arc<BreakdownSet> {
        self.breakdowns.load()
    }

    /// Score one category for one agent. Rank and level are left unset.
    pub fn score_category(
        &self,
        agent: &Agent,
        plan: &CategoryPlan,
        scores: Option<&HashMap<String, RuleScore>>,
        bonuses: &[AffinityBonus],
    ) -> CategoryBreakdown {
        let mut counted: HashSet<&str> = HashSet::new();
        let mut total = 0i64;
        let mut contributions = Vec::new();
        let mut duplicates = Vec::new();

        let sub_task_entries = plan.sub_task_rules.iter().flat_map(|(sub_task, rules)| {
            rules
                .iter()
                .map(move |rule| (rule.as_str(), TaskTarget::SubTask(sub_task.clone())))
        });
        let category_entries = plan
            .category_rules
            .iter()
            .map(|rule| (rule.as_str(), TaskTarget::Category(plan.category.name.clone())));

        for (rule, target) in sub_task_entries.chain(category_entries) {
            let Some(result) = scores.and_then(|s| s.get(rule)) else {
                continue;
            };
            let contribution = Contribution {
                rule: rule.to_string(),
                target,
                score: result.score,
                description: result.description.clone(),
            };
            if counted.insert(rule) {
                total += i64::from(result.score);
                if result.is_visible() {
                    contributions.push(contribution);
                }
            } else if result.is_visible() {
                duplicates.push(contribution);
            }
        }

        let affinity = strongest_passion(agent, &plan.category.skills)
            .and_then(|passion| bonuses.iter().find(|b| b.passion == passion))
            .filter(|bonus| counted.insert(bonus.name.as_str()))
            .map(|bonus| {
                total += i64::from(bonus.score);
                Contribution {
                    rule: bonus.name.clone(),
                    target: TaskTarget::Category(plan.category.name.clone()),
                    score: bonus.score,
                    description: bonus.description.clone(),
                }
            });

        CategoryBreakdown {
            category: plan.category.name.clone(),
            total,
            contributions,
            duplicates,
            affinity,
            rank: 0,
            level: PriorityLevel::Disabled,
        }
    }

    /// Score, sort and bucket every category available to `agent`.
    pub fn rank_agent(
        &self,
        agent: &Agent,
        plans: &[CategoryPlan],
        scores: Option<&HashMap<String, RuleScore>>,
        bonuses: &[AffinityBonus],
        tick: u64,
    ) -> AgentBreakdown {
        let scored: Vec<CategoryBreakdown> = plans
            .iter()
            .filter(|plan| plan.category.enabled && !agent.disabled_categories.contains(plan.name()))
            .map(|plan| self.score_category(agent, plan, scores, bonuses))
            .collect();

        let totals: Vec<i64> = scored.iter().map(|c| c.total).collect();
        let count = scored.len();
        let mut slots: Vec<Option<CategoryBreakdown>> = scored.into_iter().map(Some).collect();
        let categories = rank_order(&totals)
            .into_iter()
            .enumerate()
            .filter_map(|(rank, index)| {
                slots[index].take().map(|mut c| {
                    c.rank = rank;
                    c.level = self.mode.level_for(rank, count);
                    c
                })
            })
            .collect();

        AgentBreakdown {
            agent: agent.id,
            tick,
            categories,
        }
    }

    /// Rank every agent in the world, cache the breakdowns, then apply levels.
    ///
    /// Paused agents keep their previous breakdown and levels. Breakdowns of
    /// agents no longer in the world are dropped.
    pub fn recalculate(
        &self,
        world: &dyn World,
        plans: &[CategoryPlan],
        rules: &RuleScoreTable,
        bonuses: &[AffinityBonus],
        sink: &mut dyn PrioritySink,
    ) -> RankingSummary {
        let previous = self.breakdowns.load();
        let tick = world.tick();
        let mut next = BreakdownSet {
            tick,
            agents: BTreeMap::new(),
        };
        let mut summary = RankingSummary::default();
        let mut ranked = Vec::new();

        for agent in world.agents() {
            if agent.paused {
                summary.paused += 1;
                tracing::debug!(agent = %agent.id, "agent paused, keeping previous priorities");
                if let Some(kept) = previous.agent(agent.id) {
                    next.agents.insert(agent.id, kept.clone());
                }
                continue;
            }
            let breakdown = self.rank_agent(agent, plans, rules.for_agent(agent.id), bonuses, tick);
            tracing::debug!(agent = %agent.id, categories = breakdown.categories.len(), "agent ranked");
            ranked.push(agent.id);
            next.agents.insert(agent.id, breakdown);
        }

        summary.ranked = ranked.len();
        summary.pruned = previous
            .agents
            .keys()
            .filter(|id| !next.agents.contains_key(id))
            .count();

        self.breakdowns.replace(next);
        let current = self.breakdowns.load();

        for id in ranked {
            if let Some(breakdown) = current.agent(id) {
                for (category, level) in breakdown.levels() {
                    sink.apply(id, category, level);
                }
            }
        }
        summary
    }
}

/// The greatest passion among `skills`; the first skill wins ties.
fn strongest_passion(agent: &Agent, skills: &[String]) -> Option<Passion> {
    skills.iter().map(|s| agent.passion(s)).fold(None, |best, p| match best {
        Some(b) if b.magnitude() >= p.magnitude() => Some(b),
        _ => Some(p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::category::TaskCategory;
    use crate::world::{AssignedPriorities, WorldSnapshot};

    fn score(n: i32, description: &str) -> RuleScore {
        RuleScore {
            score: n,
            description: description.into(),
            matched: true,
        }
    }

    fn cooking_plan() -> CategoryPlan {
        let mut plan = CategoryPlan::new(
            TaskCategory::new("Cooking")
                .with_sub_task("CookMeals")
                .with_sub_task("Butcher")
                .with_skill("Cooking"),
        );
        plan.add_sub_task_rule("CookMeals", "low_meals");
        plan.add_sub_task_rule("Butcher", "low_meals");
        plan.add_sub_task_rule("Butcher", "corpses");
        plan.add_category_rule("low_meals");
        plan.add_category_rule("kitchen_dirty");
        plan
    }

    fn scores() -> HashMap<String, RuleScore> {
        HashMap::from([
            ("low_meals".to_string(), score(10, "few meals")),
            ("corpses".to_string(), score(4, "corpses rotting")),
            ("kitchen_dirty".to_string(), score(-3, "filthy kitchen")),
        ])
    }

    #[test]
    fn shared_rule_counts_once_per_category() {
        let engine = RankingEngine::new(LevelMode::Five);
        let agent = Agent::new(1, "Ada");
        let s = scores();
        let b = engine.score_category(&agent, &cooking_plan(), Some(&s), &[]);
        assert_eq!(b.total, 10 + 4 - 3);
        assert_eq!(b.contributions.len(), 3);
        assert_eq!(b.duplicates.len(), 2);
        assert!(b.duplicates.iter().all(|d| d.rule == "low_meals"));
        assert_eq!(b.contributions[0].target, TaskTarget::SubTask("CookMeals".into()));
    }

    #[test]
    fn strongest_passion_bonus_added_once() {
        let engine = RankingEngine::new(LevelMode::Five);
        let agent = Agent::new(1, "Ada").with_passion("Cooking", Passion::Major);
        let mut plan = cooking_plan();
        plan.category.skills.push("Plants".into());
        let bonuses = [
            AffinityBonus::new("minor_passion", Passion::Minor, 5, "interested"),
            AffinityBonus::new("major_passion", Passion::Major, 20, "burning passion"),
        ];
        let s = scores();
        let b = engine.score_category(&agent, &plan, Some(&s), &bonuses);
        assert_eq!(b.total, 11 + 20);
        assert_eq!(b.affinity.as_ref().unwrap().rule, "major_passion");
    }

    #[test]
    fn bonus_sharing_a_rule_name_is_not_counted_twice() {
        let engine = RankingEngine::new(LevelMode::Five);
        let agent = Agent::new(1, "Ada").with_passion("Cooking", Passion::Minor);
        let bonuses = [AffinityBonus::new("corpses", Passion::Minor, 5, "")];
        let s = scores();
        let b = engine.score_category(&agent, &cooking_plan(), Some(&s), &bonuses);
        assert_eq!(b.total, 11);
        assert!(b.affinity.is_none());
    }

    #[test]
    fn gated_rules_stay_out_of_the_display() {
        let engine = RankingEngine::new(LevelMode::Five);
        let agent = Agent::new(1, "Ada");
        let s = HashMap::from([("low_meals".to_string(), RuleScore::gated())]);
        let b = engine.score_category(&agent, &cooking_plan(), Some(&s), &[]);
        assert_eq!(b.total, 0);
        assert!(b.contributions.is_empty());
        assert!(b.duplicates.is_empty());
    }

    fn flat_plan(name: &str, rule: &str) -> CategoryPlan {
        let mut plan = CategoryPlan::new(TaskCategory::new(name));
        plan.add_category_rule(rule);
        plan
    }

    #[test]
    fn ranks_descending_and_buckets() {
        let engine = RankingEngine::new(LevelMode::Five);
        let agent = Agent::new(1, "Ada");
        let plans: Vec<_> = (0..10).map(|i| flat_plan(&format!("c{i}"), &format!("r{i}"))).collect();
        let s: HashMap<_, _> = (0..10).map(|i| (format!("r{i}"), score(i, ""))).collect();
        let b = engine.rank_agent(&agent, &plans, Some(&s), &[], 0);
        assert_eq!(b.categories[0].category, "c9");
        assert_eq!(b.category("c9").unwrap().level, PriorityLevel::Level(1));
        assert_eq!(b.category("c8").unwrap().level, PriorityLevel::Level(1));
        assert_eq!(b.category("c5").unwrap().level, PriorityLevel::Level(3));
        assert_eq!(b.category("c0").unwrap().level, PriorityLevel::Disabled);
    }

    #[test]
    fn disabled_categories_are_not_ranked() {
        let engine = RankingEngine::new(LevelMode::Two);
        let mut agent = Agent::new(1, "Ada");
        agent.disabled_categories.insert("b".into());
        let mut off = flat_plan("c", "r");
        off.category.enabled = false;
        let plans = vec![flat_plan("a", "r"), flat_plan("b", "r"), off];
        let b = engine.rank_agent(&agent, &plans, None, &[], 0);
        assert_eq!(b.categories.len(), 1);
        assert_eq!(b.categories[0].level, PriorityLevel::Enabled);
    }

    #[test]
    fn recalculate_applies_levels_and_skips_paused() {
        let engine = RankingEngine::new(LevelMode::Five);
        let mut paused = Agent::new(2, "Bo");
        paused.paused = true;
        let world = WorldSnapshot::default()
            .with_agent(Agent::new(1, "Ada"))
            .with_agent(paused);
        let plans = vec![flat_plan("Cooking", "low_meals")];
        let mut table = RuleScoreTable::new(0);
        table.insert(AgentId(1), "low_meals", score(10, "few meals"));
        let mut sink = AssignedPriorities::default();
        let summary = engine.recalculate(&world, &plans, &table, &[], &mut sink);
        assert_eq!(summary.ranked, 1);
        assert_eq!(summary.paused, 1);
        assert_eq!(sink.get(AgentId(1), "Cooking"), Some(PriorityLevel::Level(1)));
        assert_eq!(sink.get(AgentId(2), "Cooking"), None);
        assert_eq!(engine.breakdowns().category(AgentId(1), "Cooking").unwrap().total, 10);
    }

    #[test]
    fn departed_agents_are_pruned() {
        let engine = RankingEngine::new(LevelMode::Five);
        let plans = vec![flat_plan("Cooking", "low_meals")];
        let table = RuleScoreTable::new(0);
        let mut sink = AssignedPriorities::default();
        let world = WorldSnapshot::default()
            .with_agent(Agent::new(1, "Ada"))
            .with_agent(Agent::new(2, "Bo"));
        engine.recalculate(&world, &plans, &table, &[], &mut sink);
        assert_eq!(engine.breakdowns().agents.len(), 2);

        let world = WorldSnapshot::default().with_agent(Agent::new(1, "Ada"));
        let summary = engine.recalculate(&world, &plans, &table, &[], &mut sink);
        assert_eq!(summary.pruned, 1);
        assert!(engine.breakdowns().agent(AgentId(2)).is_none());
    }
}
