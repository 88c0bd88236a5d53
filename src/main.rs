//! rankwork CLI: rule-driven work-priority engine.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use rankwork::config::EngineConfig;
use rankwork::engine::{CycleKind, Engine};
use rankwork::registry::DefinitionRegistry;
use rankwork::signal::SignalValue;
use rankwork::world::{AssignedPriorities, World, WorldSnapshot};

#[derive(Parser)]
#[command(name = "rankwork", version, about = "Rule-driven work-priority engine")]
struct Cli {
    /// Engine configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load definitions and report every validation issue.
    Validate {
        /// Definitions file (TOML).
        #[arg(long)]
        defs: PathBuf,
    },

    /// Evaluate every signal against a world snapshot.
    Signals {
        #[arg(long)]
        defs: PathBuf,
        /// World snapshot (JSON).
        #[arg(long)]
        world: PathBuf,
    },

    /// Run one normal cycle and print each agent's levels.
    Rank {
        #[arg(long)]
        defs: PathBuf,
        #[arg(long)]
        world: PathBuf,
        /// Emit breakdowns as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Drive the scheduler for a number of ticks against a static world.
    Simulate {
        #[arg(long)]
        defs: PathBuf,
        #[arg(long)]
        world: PathBuf,
        #[arg(long, default_value = "6000")]
        ticks: u64,
    },

    /// Manage the engine configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file.
    Init {
        /// Destination path.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rankwork=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Validate { defs } => {
            let registry = DefinitionRegistry::load(&defs)?;
            let summary = registry.summary();
            println!(
                "{}: {} signals, {} rules, {} categories, {} affinity bonuses",
                defs.display(),
                summary.signals,
                summary.rules,
                summary.categories,
                summary.affinity_bonuses
            );
            if registry.issues().is_empty() {
                println!("No issues found.");
            } else {
                println!("\n{} issue(s), {} invalid definition(s):", registry.issues().len(), summary.invalid);
                for issue in registry.issues() {
                    println!("{:?}", miette::Report::new(issue.clone()));
                }
                miette::bail!("definitions have {} issue(s)", registry.issues().len());
            }
        }

        Commands::Signals { defs, world } => {
            let (engine, world) = load(config, &defs, &world)?;
            println!("Signals at tick {}:", world.tick());
            for def in engine.registry().signals() {
                let Some(value) = engine.evaluate_signal(&world, &def.name) else {
                    continue;
                };
                print_signal(&def.name, &value, &world);
            }
        }

        Commands::Rank { defs, world, json } => {
            let (engine, world) = load(config, &defs, &world)?;
            let mut levels = AssignedPriorities::default();
            let report = engine.run_normal_cycle(&world, &mut levels);

            if json {
                let out = serde_json::json!({
                    "report": report,
                    "levels": levels,
                    "breakdowns": *engine.breakdowns(),
                });
                println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
                return Ok(());
            }

            for agent in world.agents() {
                let Some(breakdown) = engine.agent_breakdown(agent.id) else {
                    println!("{} \"{}\": not ranked (paused)", agent.id, agent.name);
                    continue;
                };
                println!("{} \"{}\":", agent.id, agent.name);
                for category in &breakdown.categories {
                    println!(
                        "  [{:>2}] {:<16} total {:>5}",
                        category.level, category.category, category.total
                    );
                    for c in &category.contributions {
                        println!("         {:+5}  {} ({}) via {}", c.score, c.description, c.rule, c.target);
                    }
                    if let Some(a) = &category.affinity {
                        println!("         {:+5}  {} ({})", a.score, a.description, a.rule);
                    }
                    for d in &category.duplicates {
                        println!("         ({:+4}) {} ({}) via {}, already counted", d.score, d.description, d.rule, d.target);
                    }
                }
            }
        }

        Commands::Simulate { defs, world, ticks } => {
            let (mut engine, mut world) = load(config, &defs, &world)?;
            let mut levels = AssignedPriorities::default();
            let mut last = None;
            for _ in 0..ticks {
                world.advance();
                if let Some(report) = engine.on_tick(&world, &mut levels)
                    && report.kind == CycleKind::Normal
                {
                    last = Some(report);
                }
            }
            let stats = engine.stats();
            println!(
                "Simulated {ticks} ticks: {} urgent cycle(s), {} normal cycle(s)",
                stats.urgent_cycles, stats.normal_cycles
            );
            match last {
                Some(report) => println!(
                    "Last normal cycle at tick {}: {} signals, {} rules",
                    report.tick, report.signals, report.rules
                ),
                None => println!("No normal cycle ran; increase --ticks."),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { path } => {
                EngineConfig::default().save(&path)?;
                println!("Wrote default configuration to {}", path.display());
            }
        },
    }

    Ok(())
}

fn load(config: EngineConfig, defs: &Path, world: &Path) -> Result<(Engine, WorldSnapshot)> {
    let registry = DefinitionRegistry::load(defs)?;
    let world = WorldSnapshot::load(world)?;
    let engine = Engine::new(config, registry)?;
    Ok((engine, world))
}

fn print_signal(name: &str, value: &SignalValue, world: &WorldSnapshot) {
    println!("  {name:<24} {:>10.3}", value.global);
    if let Some(zones) = &value.per_zone {
        for (key, v) in zones {
            let label = match key {
                rankwork::world::ZoneKey::Unscoped => "(unscoped)".to_string(),
                rankwork::world::ZoneKey::Zone(id) => world
                    .zone(*id)
                    .map(|z| z.label.clone())
                    .unwrap_or_else(|| id.to_string()),
            };
            println!("    zone  {label:<18} {v:>10.3}");
        }
    }
    if let Some(agents) = &value.per_agent {
        for (id, v) in agents {
            let name = world.agent(*id).map(|a| a.name.as_str()).unwrap_or("?");
            println!("    agent {name:<18} {v:>10.3}");
        }
    }
    if let Some(stats) = value.stats {
        println!(
            "    stats mean {:.3} min {:.3} max {:.3} n={}",
            stats.mean, stats.min, stats.max, stats.count
        );
    }
}
