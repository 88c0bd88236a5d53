//! Optional external modifier providers.
//!
//! A provider supplies named scalar "affinity" values per agent from some
//! optional extension. When no extension is installed the engine uses
//! [`NoModifiers`], which never finds anything, so modifier conditions
//! become no-ops instead of errors.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::EvalResult;
use crate::world::{Agent, AgentId};

/// Best-effort lookup of external per-agent modifier values.
pub trait ModifierProvider: Send + Sync {
    /// Display name for logs.
    fn name(&self) -> &str;

    /// The value for `key` on `agent`; `Ok(None)` when the provider has none.
    fn lookup(&self, agent: &Agent, key: &str) -> EvalResult<Option<f64>>;
}

/// Installed when no modifier extension is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModifiers;

impl ModifierProvider for NoModifiers {
    fn name(&self) -> &str {
        "none"
    }

    fn lookup(&self, _agent: &Agent, _key: &str) -> EvalResult<Option<f64>> {
        Ok(None)
    }
}

/// One entry of a [`StaticModifiers`] table.
#[derive(Debug, Clone, Deserialize)]
pub struct ModifierEntry {
    pub agent: AgentId,
    pub key: String,
    pub value: f64,
}

/// A fixed table of modifier values, e.g. loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct StaticModifiers {
    values: HashMap<(AgentId, String), f64>,
}

impl StaticModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, agent: AgentId, key: impl Into<String>, value: f64) -> Self {
        self.values.insert((agent, key.into()), value);
        self
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ModifierEntry>) -> Self {
        Self {
            values: entries
                .into_iter()
                .map(|e| ((e.agent, e.key), e.value))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ModifierProvider for StaticModifiers {
    fn name(&self) -> &str {
        "static"
    }

    fn lookup(&self, agent: &Agent, key: &str) -> EvalResult<Option<f64>> {
        Ok(self.values.get(&(agent.id, key.to_string())).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_modifiers_finds_nothing() {
        let agent = Agent::new(1, "Ada");
        assert_eq!(NoModifiers.lookup(&agent, "cooking").unwrap(), None);
    }

    #[test]
    fn static_modifiers_from_json_entries() {
        let entries: Vec<ModifierEntry> =
            serde_json::from_str(r#"[{ "agent": 1, "key": "cooking", "value": 0.8 }]"#).unwrap();
        let provider = StaticModifiers::from_entries(entries);
        assert_eq!(provider.len(), 1);
        assert_eq!(provider.lookup(&Agent::new(1, "Ada"), "cooking").unwrap(), Some(0.8));
        assert_eq!(provider.lookup(&Agent::new(2, "Bo"), "cooking").unwrap(), None);
    }
}
