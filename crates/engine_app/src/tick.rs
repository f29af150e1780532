//! Fixed-timestep tick loop.
//!
//! Each tick builds a [`SystemContext`] and runs every registered system once
//! against the world. The blocking [`TickLoop::run`] sleeps away whatever is
//! left of the tick budget and warns when a tick overruns it.

use std::time::{Duration, Instant};

use anyhow::Result;
use engine_ecs::{World, WorldConfig};
use engine_system::{System, SystemContext, SystemRunner};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl TickConfig {
    /// Duration of one tick at the configured rate.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// The host's tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    /// Ticks completed so far.
    tick_id: u64,
    config: TickConfig,
    world: World,
    runner: SystemRunner,
}

impl TickLoop {
    /// Create a new tick loop owning a fresh world.
    #[must_use]
    pub fn new(config: TickConfig, world_config: WorldConfig) -> Self {
        Self {
            tick_id: 0,
            config,
            world: World::with_config(world_config).with_name("simulation"),
            runner: SystemRunner::new(),
        }
    }

    /// Returns the number of ticks completed.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns the system runner.
    #[must_use]
    pub fn runner(&self) -> &SystemRunner {
        &self.runner
    }

    /// Registers a system. See [`SystemRunner::add`].
    ///
    /// # Errors
    ///
    /// Returns the system's `init` error if the loop is already initialized.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<bool> {
        self.runner.add(&mut self.world, system)
    }

    /// Initializes every registered system.
    ///
    /// # Errors
    ///
    /// Returns the first `init` error.
    pub fn init(&mut self) -> Result<()> {
        self.runner.init(&mut self.world)
    }

    /// Run one tick of the simulation.
    ///
    /// # Errors
    ///
    /// Returns the first system error; the tick counter is not advanced.
    pub fn tick(&mut self, dt: f64) -> Result<()> {
        let ctx = SystemContext::new(self.tick_id, dt);
        debug!(tick_id = self.tick_id, dt, entities = self.world.entity_count(), "tick start");
        self.runner.update(&mut self.world, &ctx)?;
        self.tick_id += 1;
        Ok(())
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    ///
    /// Systems are initialized first if that has not happened yet.
    ///
    /// # Errors
    ///
    /// Returns the first system error.
    pub fn run(&mut self) -> Result<()> {
        if !self.runner.is_initialized() {
            self.init()?;
        }

        let tick_duration = self.config.tick_duration();
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            systems = self.runner.len(),
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.tick(tick_duration.as_secs_f64())?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(
                    ticks = tick_count,
                    entities = self.world.entity_count(),
                    "tick loop complete"
                );
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
        Ok(())
    }

    /// Disposes every system and destroys every entity.
    ///
    /// # Errors
    ///
    /// Propagates a failure to clear the world.
    pub fn shutdown(&mut self) -> Result<()> {
        self.runner.shutdown(&mut self.world);
        self.world.clear()?;
        Ok(())
    }
}
