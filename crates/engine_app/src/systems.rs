//! Demo systems driving the simulation.

use anyhow::{Context, Result};
use engine_ecs::{Query, World};
use engine_system::{System, SystemContext};
use tracing::debug;

use crate::components::{Lifetime, Position, Velocity};
use crate::config::SpawnConfig;

/// Creates moving, short-lived entities every tick.
#[derive(Debug)]
pub struct Spawner {
    config: SpawnConfig,
    spawned: u64,
}

impl Spawner {
    #[must_use]
    pub fn new(config: SpawnConfig) -> Self {
        Self { config, spawned: 0 }
    }

    /// Entities spawned so far.
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.spawned
    }
}

impl System for Spawner {
    fn update(&mut self, world: &mut World, _ctx: &SystemContext) -> Result<()> {
        for _ in 0..self.config.per_tick {
            let entity = world.create_entity();
            // Spread headings around the unit circle.
            let angle = self.spawned as f32 * 0.618_034 * std::f32::consts::TAU;
            world.insert_component(entity, Position::default())?;
            world.insert_component(
                entity,
                Velocity {
                    x: angle.cos(),
                    y: angle.sin(),
                },
            )?;
            world.insert_component(
                entity,
                Lifetime {
                    remaining: self.config.lifetime,
                },
            )?;
            self.spawned += 1;
        }
        Ok(())
    }
}

/// Integrates `Position += Velocity * dt`.
#[derive(Debug, Default)]
pub struct Movement {
    query: Option<Query>,
}

impl System for Movement {
    fn init(&mut self, world: &mut World) -> Result<()> {
        self.query = Some(
            world
                .query()
                .with_all::<Position>()
                .with_all::<Velocity>()
                .build(),
        );
        Ok(())
    }

    fn update(&mut self, world: &mut World, ctx: &SystemContext) -> Result<()> {
        let query = self.query.as_ref().context("movement system used before init")?;
        let dt = ctx.dt_f32();
        for entity in query {
            let velocity = *world.get_component::<Velocity>(entity)?;
            let position = world.get_component_mut::<Position>(entity)?;
            position.x += velocity.x * dt;
            position.y += velocity.y * dt;
        }
        Ok(())
    }
}

/// Counts lifetimes down and destroys expired entities.
#[derive(Debug, Default)]
pub struct Expiry {
    query: Option<Query>,
    expired: u64,
}

impl System for Expiry {
    fn init(&mut self, world: &mut World) -> Result<()> {
        self.query = Some(world.query().with_all::<Lifetime>().build());
        Ok(())
    }

    fn update(&mut self, world: &mut World, ctx: &SystemContext) -> Result<()> {
        let query = self.query.as_ref().context("expiry system used before init")?;
        let dt = ctx.dt_f32();
        let mut expired = 0u64;
        for entity in query {
            let lifetime = world.get_component_mut::<Lifetime>(entity)?;
            lifetime.remaining -= dt;
            if lifetime.remaining <= 0.0 {
                world.destroy_entity(entity)?;
                expired += 1;
            }
        }
        if expired > 0 {
            debug!(tick_id = ctx.tick_id, expired, alive = query.len(), "entities expired");
        }
        self.expired += expired;
        Ok(())
    }

    fn dispose(&mut self, _world: &mut World) {
        debug!(expired = self.expired, "expiry system disposed");
        self.query = None;
    }
}

#[cfg(test)]
mod tests {
    use engine_system::SystemRunner;

    use super::*;

    #[test]
    fn test_movement_integrates_velocity() {
        let mut world = World::new();
        let mut movement = Movement::default();
        movement.init(&mut world).unwrap();

        let e = world.create_entity();
        world.insert_component(e, Position { x: 1.0, y: 1.0 }).unwrap();
        world.insert_component(e, Velocity { x: 2.0, y: -4.0 }).unwrap();
        let still = world.create_entity();
        world.insert_component(still, Position::default()).unwrap();

        movement.update(&mut world, &SystemContext::new(0, 0.5)).unwrap();
        assert_eq!(world.get_component::<Position>(e), Ok(&Position { x: 2.0, y: -1.0 }));
        assert_eq!(world.get_component::<Position>(still), Ok(&Position::default()));
    }

    #[test]
    fn test_update_before_init_fails() {
        let mut world = World::new();
        let mut movement = Movement::default();
        assert!(movement.update(&mut world, &SystemContext::new(0, 0.1)).is_err());
    }

    #[test]
    fn test_expiry_destroys_mid_iteration() {
        let mut world = World::new();
        let mut expiry = Expiry::default();
        expiry.init(&mut world).unwrap();

        let short = world.create_entity();
        world.insert_component(short, Lifetime { remaining: 0.25 }).unwrap();
        let long = world.create_entity();
        world.insert_component(long, Lifetime { remaining: 1.0 }).unwrap();

        expiry.update(&mut world, &SystemContext::new(0, 0.25)).unwrap();
        assert!(!world.is_entity_valid(short));
        assert!(world.is_entity_valid(long));
        assert_eq!(expiry.expired, 1);
    }

    #[test]
    fn test_population_reaches_steady_state() {
        let mut world = World::new();
        let mut runner = SystemRunner::new();
        let spawn = SpawnConfig {
            per_tick: 3,
            lifetime: 0.5,
        };
        runner.add(&mut world, Spawner::new(spawn)).unwrap();
        runner.add(&mut world, Movement::default()).unwrap();
        runner.add(&mut world, Expiry::default()).unwrap();
        runner.init(&mut world).unwrap();

        for tick in 0..20 {
            runner.update(&mut world, &SystemContext::new(tick, 0.25)).unwrap();
        }

        // Each batch lives for two ticks and dies during the second.
        assert_eq!(world.entity_count(), 3);
        assert!(world.capacity() <= 512, "destroyed indices are recycled");
        assert_eq!(world.query_count(), 2);
        assert_eq!(runner.get::<Spawner>().map(Spawner::spawned), Some(60));
    }
}
