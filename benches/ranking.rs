//! Benchmarks for signal evaluation and full normal cycles.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};

use rankwork::config::EngineConfig;
use rankwork::engine::Engine;
use rankwork::ranking::{LevelMode, assign_levels};
use rankwork::registry::DefinitionRegistry;
use rankwork::world::{Agent, AssignedPriorities, WorldObject, WorldSnapshot, ZoneId, ZoneKind};

const DEFS: &str = include_str!("../data/demo/definitions.toml");

const ITEMS: [&str; 5] = ["MealSimple", "Steel", "WoodLog", "Corpse", "Filth"];

fn synthetic_world(agents: usize, objects: usize) -> WorldSnapshot {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let mut world = WorldSnapshot::default()
        .with_zone(1, "Kitchen", ZoneKind::Room)
        .with_zone(2, "Freezer", ZoneKind::Storage)
        .with_zone(3, "Bedroom", ZoneKind::Room)
        .with_zone(4, "Yard", ZoneKind::Outdoors);
    world.weather = Some("Rain".into());

    for i in 0..objects {
        let def = ITEMS[rng.gen_range(0..ITEMS.len())];
        let mut item = WorldObject::item(i as u64, def, rng.gen_range(1..75)).in_zone(ZoneId(rng.gen_range(1..=4)));
        item.in_storage = rng.gen_bool(0.3);
        item.hit_points = rng.gen_range(0.1..1.0);
        world = world.with_object(item);
    }
    for i in 0..agents {
        let agent = Agent::new(i as u64 + 1, format!("Pawn{i}"))
            .with_attribute("Cooking", rng.gen_range(0.0..20.0))
            .with_attribute("Medicine", rng.gen_range(0.0..20.0))
            .with_attribute("Mining", rng.gen_range(0.0..20.0))
            .with_need("Food", rng.gen_range(0.0..1.0))
            .in_zone(ZoneId(rng.gen_range(1..=4)));
        world = world.with_agent(agent);
    }
    world
}

fn bench_normal_cycle(c: &mut Criterion) {
    let world = synthetic_world(20, 2_000);
    let registry = DefinitionRegistry::from_toml_str(DEFS).unwrap();
    let config = EngineConfig {
        cache_ttl_ticks: 0,
        ..Default::default()
    };
    let engine = Engine::new(config, registry).unwrap();

    c.bench_function("normal_cycle_20_agents_2k_objects", |bench| {
        bench.iter(|| {
            let mut sink = AssignedPriorities::default();
            black_box(engine.run_normal_cycle(&world, &mut sink))
        })
    });
}

fn bench_urgent_cycle(c: &mut Criterion) {
    let world = synthetic_world(20, 2_000);
    let registry = DefinitionRegistry::from_toml_str(DEFS).unwrap();
    let config = EngineConfig {
        cache_ttl_ticks: 0,
        ..Default::default()
    };
    let engine = Engine::new(config, registry).unwrap();

    c.bench_function("urgent_cycle_20_agents_2k_objects", |bench| {
        bench.iter(|| black_box(engine.run_urgent_cycle(&world)))
    });
}

fn bench_assign_levels(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let totals: Vec<i64> = (0..24).map(|_| rng.gen_range(-100..200)).collect();

    c.bench_function("assign_levels_24", |bench| {
        bench.iter(|| black_box(assign_levels(&totals, LevelMode::Five)))
    });
}

criterion_group!(benches, bench_normal_cycle, bench_urgent_cycle, bench_assign_levels);
criterion_main!(benches);
