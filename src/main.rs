mod simulation;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use simulation::{SimConfig, SimEngine};

#[derive(Parser)]
#[command(name = "urban_sim")]
#[command(about = "Multi-modal urban traffic simulation engine")]
struct Cli {
    /// Built-in map to load
    #[arg(long, default_value = "grid")]
    map: String,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "600")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f64,

    /// Agents to spawn before the run starts
    #[arg(long, default_value = "25")]
    spawn: usize,

    /// Random seed for reproducible simulations
    #[arg(long)]
    seed: Option<u64>,

    /// Run in test mode: quick, reproducible simulation with validation
    #[arg(long)]
    test: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if cli.test {
        let seed = cli.seed.unwrap_or(42);
        let passed = run_test_simulation(&cli.map, cli.ticks, cli.delta, cli.spawn, seed)?;
        std::process::exit(if passed { 0 } else { 1 });
    }

    run_headless(&cli)
}

/// Run the simulation headless and log periodic summaries.
fn run_headless(cli: &Cli) -> Result<()> {
    let config = SimConfig::default();
    let mut engine = match cli.seed {
        Some(seed) => SimEngine::from_builtin_seeded(&cli.map, config, seed),
        None => SimEngine::from_builtin(&cli.map, config),
    }
    .with_context(|| format!("failed to load map `{}`", cli.map))?;

    let spawned = engine
        .spawn_many(cli.spawn, None)
        .context("initial spawn failed")?;
    info!(requested = cli.spawn, spawned, "initial agents spawned");

    engine.start();
    let report_every = ((1.0 / cli.delta).ceil() as u32).max(1) * 10;

    for tick in 1..=cli.ticks {
        let summary = engine.tick_with(cli.delta);
        if tick % report_every == 0 {
            info!(
                step = summary.step,
                active = summary.active_agents,
                moved = summary.moved,
                arrived = summary.arrived,
                accidents = summary.accidents.len(),
                "progress"
            );
        }
    }
    engine.stop();

    let stats = engine.traffic_statistics();
    info!(
        total_spawned = engine.total_spawned(),
        arrived = stats.vehicle_statistics.arrived_agents,
        active = stats.vehicle_statistics.active_agents,
        total_reroutes = stats.vehicle_statistics.total_reroutes,
        average_travel_time = stats.vehicle_statistics.average_travel_time,
        average_density = stats.traffic_statistics.average_density,
        "simulation complete"
    );
    Ok(())
}

/// Run a seeded simulation and validate engine invariants along the way.
fn run_test_simulation(map: &str, ticks: u32, delta: f64, spawn: usize, seed: u64) -> Result<bool> {
    info!(map, ticks, delta, spawn, seed, "running in test mode");

    let mut engine = SimEngine::from_builtin_seeded(map, SimConfig::default(), seed)
        .with_context(|| format!("failed to load map `{}`", map))?;
    let spawned = engine.spawn_many(spawn, None)?;

    let mut errors: Vec<String> = Vec::new();
    if spawned == 0 && spawn > 0 {
        errors.push("no agents could be spawned".to_string());
    }

    for tick in 1..=ticks {
        engine.tick_with(delta);

        if tick % 100 != 0 {
            continue;
        }
        for agent in engine.agents() {
            if agent.path.get(agent.path_index) != Some(&agent.current_node) {
                errors.push(format!(
                    "tick {tick}: agent {} path index desynced",
                    agent.id
                ));
            }
            if !(0.0..=1.0).contains(&agent.position_on_edge) {
                errors.push(format!(
                    "tick {tick}: agent {} position {} out of range",
                    agent.id, agent.position_on_edge
                ));
            }
            if agent.status == "arrived" && agent.travel_time.is_none() {
                errors.push(format!(
                    "tick {tick}: agent {} arrived without a travel time",
                    agent.id
                ));
            }
        }
        for edge in engine.map_data().edges {
            match engine.multiplier(&edge.from, &edge.to) {
                Some(value) if value > 0.0 => {}
                Some(value) => errors.push(format!(
                    "tick {tick}: edge {}->{} has non-positive multiplier {value}",
                    edge.from, edge.to
                )),
                None => errors.push(format!(
                    "tick {tick}: edge {}->{} has no multiplier",
                    edge.from, edge.to
                )),
            }
        }
    }

    let stats = engine.vehicle_statistics();
    info!(
        spawned,
        arrived = stats.arrived_agents,
        active = stats.active_agents,
        reroutes = stats.total_reroutes,
        "test run finished"
    );

    if errors.is_empty() {
        info!("TEST PASSED: all validations succeeded");
        Ok(true)
    } else {
        for error in &errors {
            tracing::error!("{error}");
        }
        tracing::error!("TEST FAILED: {} error(s) detected", errors.len());
        Ok(false)
    }
}
