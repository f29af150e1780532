//! # engine_app: simulation host
//!
//! Runs a headless world through a fixed-timestep loop with a small demo
//! workload: a spawner creating moving entities, a movement system and an
//! expiry system that destroys entities while iterating its query.
//!
//! ## Startup Sequence
//!
//! 1. Parse CLI flags and load the optional JSON config file.
//! 2. Register the demo systems and initialize them.
//! 3. Enter the tick loop; `--ticks 0` runs until interrupted.

mod components;
mod config;
mod systems;
mod tick;

use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use systems::{Expiry, Movement, Spawner};
use tick::TickLoop;

#[derive(Parser, Debug)]
#[command(name = "engine_app", about = "Headless ECS simulation host")]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to run (0 = unlimited)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Target ticks per second
    #[arg(short = 'r', long)]
    tick_rate: Option<f64>,

    /// Entities spawned per tick
    #[arg(short, long)]
    spawn: Option<u32>,
}

impl Args {
    /// Loads the config file (or defaults) and applies flag overrides.
    fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(ticks) = self.ticks {
            config.tick.max_ticks = ticks;
        }
        if let Some(rate) = self.tick_rate {
            config.tick.tick_rate = rate;
        }
        if let Some(spawn) = self.spawn {
            config.spawn.per_tick = spawn;
        }
        ensure!(
            config.tick.tick_rate.is_finite() && config.tick.tick_rate > 0.0,
            "tick rate must be positive, got {}",
            config.tick.tick_rate
        );
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = args.resolve()?;
    info!(?config, "simulation host starting");

    let mut tick_loop = TickLoop::new(config.tick, config.world);
    tick_loop.add_system(Spawner::new(config.spawn))?;
    tick_loop.add_system(Movement::default())?;
    tick_loop.add_system(Expiry::default())?;
    tick_loop.init()?;
    info!(
        systems = ?tick_loop.runner().names().collect::<Vec<_>>(),
        "systems ready"
    );

    tick_loop.run()?;

    let world = tick_loop.world();
    info!(
        world = world.name(),
        ticks = tick_loop.tick_id(),
        spawned = tick_loop.runner().get::<Spawner>().map_or(0, Spawner::spawned),
        entities = world.entity_count(),
        capacity = world.capacity(),
        queries = world.query_count(),
        "simulation finished"
    );
    tick_loop.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from(["engine_app", "--ticks", "12", "-r", "30", "--spawn", "2"])
            .unwrap();
        let config = args.resolve().unwrap();
        assert_eq!(config.tick.max_ticks, 12);
        assert!((config.tick.tick_rate - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.spawn.per_tick, 2);
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let args = Args::try_parse_from(["engine_app", "--tick-rate", "0"]).unwrap();
        assert!(args.resolve().is_err());
    }
}
