use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ev_detour::controller::{ControllerConfig, Orchestrator, DEFAULT_EV_TYPES};
use ev_detour::simulation::SimWorld;

#[derive(Parser)]
#[command(name = "ev_detour")]
#[command(about = "Routes low-battery EVs through charging stations in a headless traffic simulation")]
struct Cli {
    /// State of charge below which an EV is sent to charge
    #[arg(long, default_value = "0.47")]
    threshold: f64,

    /// Vehicle types treated as EVs, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_EV_TYPES.map(String::from))]
    ev_types: Vec<String>,

    /// Number of trips to generate
    #[arg(long, default_value = "60")]
    vehicles: usize,

    /// Seconds over which trips depart
    #[arg(long, default_value = "120")]
    depart_window: f64,

    /// Seed for the world's random number generator
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Junctions per side of the road grid
    #[arg(long, default_value = "6")]
    grid: usize,

    /// Time delta per step in seconds
    #[arg(long, default_value = "1.0")]
    delta: f64,

    /// End the simulation after this many steps
    #[arg(long, default_value = "3600")]
    max_steps: u64,

    /// Print the world summary when the run ends
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = ControllerConfig::default()
        .with_threshold(cli.threshold)
        .with_ev_types(cli.ev_types.iter().map(|t| t.trim().to_string()));
    let mut orchestrator = Orchestrator::new(config).context("Invalid controller configuration")?;

    if !(cli.delta.is_finite() && cli.delta > 0.0) {
        anyhow::bail!("Step delta must be positive, got {}", cli.delta);
    }

    let mut world = SimWorld::create_test_world_with_seed(cli.seed, cli.grid)
        .context("Failed to build test world")?
        .with_step_secs(cli.delta)
        .with_step_limit(cli.max_steps);
    let trips = world
        .spawn_random_trips(cli.vehicles, cli.depart_window)
        .context("Failed to generate trips")?;

    info!(
        "Running EV charging simulation: {} trips, {} charging stations, grid {}x{}",
        trips.len(),
        world.stations.len(),
        cli.grid,
        cli.grid
    );

    orchestrator.run(&mut world)?;

    if cli.summary {
        world.print_summary();
    }

    Ok(())
}
