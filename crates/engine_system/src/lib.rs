//! # engine_system
//!
//! Periodic logic units that run against an [`engine_ecs::World`].
//!
//! This crate provides:
//!
//! - [`System`] trait: `init` / `update` / `dispose` hooks.
//! - [`SystemContext`]: tick id and delta time handed to every update.
//! - [`SystemRunner`]: an ordered list of systems, at most one per type,
//!   each retrievable by its concrete type.
//!
//! ## Usage
//!
//! ```rust
//! use engine_ecs::World;
//! use engine_system::{System, SystemContext, SystemRunner};
//!
//! #[derive(Default)]
//! struct Spawner;
//!
//! impl System for Spawner {
//!     fn update(&mut self, world: &mut World, _ctx: &SystemContext) -> anyhow::Result<()> {
//!         world.create_entity();
//!         Ok(())
//!     }
//! }
//!
//! let mut world = World::new();
//! let mut runner = SystemRunner::new();
//! runner.add(&mut world, Spawner).unwrap();
//! runner.init(&mut world).unwrap();
//! runner.update(&mut world, &SystemContext::new(0, 0.016)).unwrap();
//! assert_eq!(world.entity_count(), 1);
//! ```

pub mod context;
pub mod runner;
pub mod system;

pub use context::SystemContext;
pub use runner::SystemRunner;
pub use system::System;
