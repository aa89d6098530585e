//! # tessera_demo
//!
//! Runs a small particle simulation on top of the tessera world: particles
//! move every frame, lose health, get destroyed and replaced, and are
//! periodically frozen, so every storage path (spawn, migration, swap-remove,
//! id recycling, cached queries) is exercised.

mod components;
mod simulation;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use simulation::Simulation;
use tessera_world::WorldConfig;

#[derive(Parser, Debug)]
#[command(name = "tessera_demo", about = "Particle simulation on the tessera storage engine")]
struct Args {
    /// Number of particles to spawn
    #[arg(short, long, default_value_t = 1_000)]
    entities: usize,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 120)]
    frames: u64,

    /// Simulated frames per second
    #[arg(short, long, default_value_t = 60.0)]
    rate: f32,

    /// JSON world configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tessera_demo=info".parse()?))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            info!(file = %path.display(), "loading world config");
            WorldConfig::from_path(path)?
        }
        None => WorldConfig::default(),
    };
    anyhow::ensure!(args.rate > 0.0, "--rate must be positive");

    info!(
        entities = args.entities,
        frames = args.frames,
        initial_capacity = config.initial_capacity,
        "simulation starting"
    );
    let mut simulation = Simulation::new(config, args.entities, args.rate)?;

    for _ in 0..args.frames {
        let stats = simulation.step()?;
        if stats.frame % 30 == 0 {
            info!(
                frame = stats.frame,
                moved = stats.moved,
                respawned = stats.respawned,
                toggled = stats.toggled,
                "progress"
            );
        }
    }

    let world = simulation.world();
    info!(
        alive = world.alive_count(),
        placed = world.entity_count(),
        archetypes = world.archetype_count(),
        generation = world.generation(),
        respawned = simulation.respawned(),
        "simulation complete"
    );
    Ok(())
}
