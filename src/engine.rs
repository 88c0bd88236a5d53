//! Engine facade: top-level API for the rankwork system.
//!
//! The `Engine` owns the definition registry, the three evaluation stages,
//! the swap-on-write result stores and the scheduler. A host calls
//! [`Engine::on_tick`] once per simulation tick; everything else is
//! read-only inspection of the last completed cycle.
//!
//! Within a normal cycle every signal is evaluated and swapped in before
//! any rule reads it, every rule for every agent is scored before ranking
//! starts, and every agent's breakdown is cached before any level is
//! applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::context::EvaluationContext;
use crate::error::RankResult;
use crate::ranking::{AgentBreakdown, BreakdownSet, CategoryBreakdown, RankingEngine, RankingSummary};
use crate::registry::DefinitionRegistry;
use crate::rule::{ModifierProvider, RuleEngine, RuleScore, RuleScoreTable};
use crate::scheduler::{CadenceFire, Scheduler};
use crate::signal::cache::SignalCache;
use crate::signal::{SignalDefinition, SignalEngine, SignalSnapshot, SignalStore, SignalValue, SourceFn, SourceKind};
use crate::snapshot::SnapshotCell;
use crate::world::{AgentId, PrioritySink, World};

/// Which cadence a cycle ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    Urgent,
    Normal,
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub tick: u64,
    /// Signals evaluated.
    pub signals: usize,
    /// Rules evaluated per agent.
    pub rules: usize,
    /// Present for normal cycles.
    pub ranking: Option<RankingSummary>,
}

/// Cycle counters since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub urgent_cycles: u64,
    pub normal_cycles: u64,
}

/// The rankwork priority engine.
pub struct Engine {
    config: EngineConfig,
    registry: DefinitionRegistry,
    signal_engine: SignalEngine,
    rule_engine: RuleEngine,
    ranking: RankingEngine,
    signals: SignalStore,
    rule_scores: SnapshotCell<RuleScoreTable>,
    cache: SignalCache<Arc<SignalValue>>,
    scheduler: Scheduler,
    urgent_cycles: AtomicU64,
    normal_cycles: AtomicU64,
}

impl Engine {
    /// Create an engine over loaded definitions.
    pub fn new(config: EngineConfig, registry: DefinitionRegistry) -> RankResult<Self> {
        config.validate()?;
        tracing::info!(
            signals = registry.signals().len(),
            rules = registry.rules().len(),
            categories = registry.categories().len(),
            issues = registry.issues().len(),
            urgent_interval = config.urgent_interval_ticks,
            normal_interval = config.normal_interval_ticks,
            "engine initialized"
        );
        Ok(Self {
            ranking: RankingEngine::new(config.level_mode),
            cache: SignalCache::new(config.cache_ttl_ticks),
            scheduler: Scheduler::from_config(&config),
            config,
            registry,
            signal_engine: SignalEngine::new(),
            rule_engine: RuleEngine::new(),
            signals: SignalStore::new(),
            rule_scores: SnapshotCell::new(),
            urgent_cycles: AtomicU64::new(0),
            normal_cycles: AtomicU64::new(0),
        })
    }

    /// Install an external modifier provider.
    pub fn with_modifiers(mut self, provider: Arc<dyn ModifierProvider>) -> Self {
        tracing::info!(provider = provider.name(), "modifier provider installed");
        self.rule_engine = RuleEngine::with_modifiers(provider);
        self
    }

    /// Install or replace the evaluator for one source kind.
    pub fn register_source(&mut self, kind: SourceKind, f: SourceFn) {
        self.signal_engine.register(kind, f);
    }

    // ── Driving ─────────────────────────────────────────────────────────

    /// Advance the scheduler by one tick and run whichever cycle fires.
    ///
    /// When both cadences fire together only the normal cycle runs, since it
    /// refreshes everything the urgent one would.
    pub fn on_tick(&mut self, world: &dyn World, sink: &mut dyn PrioritySink) -> Option<CycleReport> {
        let fire: CadenceFire = self.scheduler.tick();
        if fire.normal {
            Some(self.run_normal_cycle(world, sink))
        } else if fire.urgent {
            Some(self.run_urgent_cycle(world))
        } else {
            None
        }
    }

    /// Evaluate everything, rank every agent and apply levels.
    pub fn run_normal_cycle(&self, world: &dyn World, sink: &mut dyn PrioritySink) -> CycleReport {
        let tick = world.tick();
        let updates = self.evaluate_signals(world, self.registry.signals().iter(), tick);
        let signal_count = updates.len();
        self.signals
            .replace(SignalSnapshot::new(tick).merged(tick, updates));

        let ctx = self.context(world);
        let table = self.rule_engine.evaluate_all(&ctx, self.registry.valid_rules());
        let rule_count = self.registry.valid_rules().count();
        self.rule_scores.replace(table);
        let table = self.rule_scores.load();

        let summary = self.ranking.recalculate(
            world,
            self.registry.plans(),
            &table,
            self.registry.affinity_bonuses(),
            sink,
        );
        let purged = self.cache.purge_expired(tick);
        let cycles = self.normal_cycles.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::info!(
            tick,
            cycle = cycles,
            signals = signal_count,
            rules = rule_count,
            ranked = summary.ranked,
            paused = summary.paused,
            pruned = summary.pruned,
            purged,
            "normal cycle complete"
        );
        CycleReport {
            kind: CycleKind::Normal,
            tick,
            signals: signal_count,
            rules: rule_count,
            ranking: Some(summary),
        }
    }

    /// Refresh urgent signals and urgent rule scores. Does not rank.
    pub fn run_urgent_cycle(&self, world: &dyn World) -> CycleReport {
        let tick = world.tick();
        let urgent = self.registry.signals().iter().filter(|s| s.urgent);
        let updates = self.evaluate_signals(world, urgent, tick);
        let signal_count = updates.len();
        let previous = self.signals.load();
        self.signals.replace(previous.merged(tick, updates));

        let ctx = self.context(world);
        let fresh = self.rule_engine.evaluate_all(&ctx, self.registry.urgent_rules());
        let rule_count = self.registry.urgent_rules().count();
        let merged = self.rule_scores.load().merged(&fresh);
        self.rule_scores.replace(merged);
        self.urgent_cycles.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(tick, signals = signal_count, rules = rule_count, "urgent cycle complete");
        CycleReport {
            kind: CycleKind::Urgent,
            tick,
            signals: signal_count,
            rules: rule_count,
            ranking: None,
        }
    }

    fn context<'a>(&'a self, world: &'a dyn World) -> EvaluationContext<'a> {
        EvaluationContext::new(world, self.signals.load(), self.signal_engine.filters())
            .with_neutral_score(self.config.neutral_score)
    }

    /// Re-evaluate signals for a cycle. Only values computed on this same
    /// tick are reused; invalid definitions are zero.
    fn evaluate_signals<'d>(
        &self,
        world: &dyn World,
        definitions: impl Iterator<Item = &'d SignalDefinition>,
        tick: u64,
    ) -> Vec<(String, Arc<SignalValue>)> {
        definitions
            .map(|def| {
                let value = if self.registry.is_valid_signal(&def.name) {
                    self.cache.refresh_with(&def.name, tick, || {
                        Arc::new(self.signal_engine.evaluate_or_zero(world, def))
                    })
                } else {
                    Arc::new(SignalValue::zero())
                };
                (def.name.clone(), value)
            })
            .collect()
    }

    fn evaluate_cached(&self, world: &dyn World, def: &SignalDefinition, tick: u64) -> Arc<SignalValue> {
        if !self.registry.is_valid_signal(&def.name) {
            return Arc::new(SignalValue::zero());
        }
        self.cache.get_or_insert_with(&def.name, tick, || {
            Arc::new(self.signal_engine.evaluate_or_zero(world, def))
        })
    }

    /// Evaluate one signal on demand, reusing a cached value younger than the TTL.
    pub fn evaluate_signal(&self, world: &dyn World, name: &str) -> Option<Arc<SignalValue>> {
        let def = self.registry.signal(name)?;
        Some(self.evaluate_cached(world, def, world.tick()))
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Last computed global value of a signal.
    pub fn signal(&self, name: &str) -> Option<f64> {
        self.signals.load().global(name)
    }

    /// Last computed value of a signal, with its breakdowns.
    pub fn signal_value(&self, name: &str) -> Option<Arc<SignalValue>> {
        self.signals.load().shared(name)
    }

    /// The whole last signal snapshot.
    pub fn signal_snapshot(&self) -> Arc<SignalSnapshot> {
        self.signals.load()
    }

    /// Last score of one rule for one agent.
    pub fn rule_score(&self, agent: AgentId, rule: &str) -> Option<RuleScore> {
        self.rule_scores.load().get(agent, rule).cloned()
    }

    /// Last breakdown of one category for one agent.
    pub fn breakdown(&self, agent: AgentId, category: &str) -> Option<CategoryBreakdown> {
        self.ranking.breakdowns().category(agent, category).cloned()
    }

    /// Last breakdown of every ranked category for one agent.
    pub fn agent_breakdown(&self, agent: AgentId) -> Option<AgentBreakdown> {
        self.ranking.breakdowns().agent(agent).cloned()
    }

    /// Every cached breakdown.
    pub fn breakdowns(&self) -> Arc<BreakdownSet> {
        self.ranking.breakdowns()
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            urgent_cycles: self.urgent_cycles.load(Ordering::Relaxed),
            normal_cycles: self.normal_cycles.load(Ordering::Relaxed),
        }
    }
}
