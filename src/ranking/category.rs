//! Task categories, passions and affinity bonuses.

use serde::{Deserialize, Serialize};

/// How strongly an agent likes working a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Passion {
    #[default]
    None,
    Minor,
    Major,
}

impl Passion {
    pub fn magnitude(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Minor => 1,
            Self::Major => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

/// A top-level task grouping with ordered sub-tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCategory {
    pub name: String,
    /// In priority order.
    #[serde(default)]
    pub sub_tasks: Vec<String>,
    /// Skills whose passion decides the affinity bonus.
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "yes")]
    pub enabled: bool,
}

fn yes() -> bool {
    true
}

impl TaskCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_tasks: Vec::new(),
            skills: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_sub_task(mut self, name: impl Into<String>) -> Self {
        self.sub_tasks.push(name.into());
        self
    }

    pub fn with_skill(mut self, name: impl Into<String>) -> Self {
        self.skills.push(name.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A fixed bonus granted for the strongest passion among a category's skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityBonus {
    pub name: String,
    pub passion: Passion,
    pub score: i32,
    #[serde(default)]
    pub description: String,
}

impl AffinityBonus {
    pub fn new(name: impl Into<String>, passion: Passion, score: i32, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passion,
            score,
            description: description.into(),
        }
    }
}

/// The rules that feed one category, resolved once at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPlan {
    pub category: TaskCategory,
    /// Rule names per sub-task, in the category's sub-task order.
    pub sub_task_rules: Vec<(String, Vec<String>)>,
    /// Rule names targeting the category directly.
    pub category_rules: Vec<String>,
}

impl CategoryPlan {
    pub fn new(category: TaskCategory) -> Self {
        let sub_task_rules = category
            .sub_tasks
            .iter()
            .map(|s| (s.clone(), Vec::new()))
            .collect();
        Self {
            category,
            sub_task_rules,
            category_rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.category.name
    }

    /// Attach a rule to a sub-task. Returns false if the sub-task is not part of this category.
    pub fn add_sub_task_rule(&mut self, sub_task: &str, rule: impl Into<String>) -> bool {
        match self.sub_task_rules.iter_mut().find(|(name, _)| name == sub_task) {
            Some((_, rules)) => {
                rules.push(rule.into());
                true
            }
            None => false,
        }
    }

    pub fn add_category_rule(&mut self, rule: impl Into<String>) {
        self.category_rules.push(rule.into());
    }

    pub fn rule_count(&self) -> usize {
        self.category_rules.len() + self.sub_task_rules.iter().map(|(_, r)| r.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_attaches_rules_to_known_sub_tasks_only() {
        let mut plan = CategoryPlan::new(
            TaskCategory::new("Cooking")
                .with_sub_task("CookMeals")
                .with_sub_task("Butcher"),
        );
        assert!(plan.add_sub_task_rule("Butcher", "corpses"));
        assert!(!plan.add_sub_task_rule("Brew", "beer"));
        plan.add_category_rule("low_meals");
        assert_eq!(plan.rule_count(), 2);
        assert_eq!(plan.sub_task_rules[1].1, vec!["corpses".to_string()]);
    }

    #[test]
    fn category_defaults_from_toml() {
        let c: TaskCategory = toml::from_str("name = \"Hauling\"").unwrap();
        assert!(c.enabled);
        assert!(c.sub_tasks.is_empty());
    }

    #[test]
    fn passion_order() {
        assert!(Passion::Major.magnitude() > Passion::Minor.magnitude());
        let p: AffinityBonus =
            toml::from_str("name = \"burning\"\npassion = \"major\"\nscore = 20").unwrap();
        assert_eq!(p.passion, Passion::Major);
    }
}
