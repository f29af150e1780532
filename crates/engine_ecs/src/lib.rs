//! # engine_ecs
//!
//! An in-process entity-component system with incrementally maintained
//! queries.
//!
//! This crate provides:
//!
//! - [`Entity`] and [`EntityTable`]: `u32` identifiers with signed
//!   generation counters and index recycling.
//! - [`ComponentStore`]: sparse-set storage, one per component kind.
//! - [`QueryDesc`] and [`Query`]: `all`/`any`/`none` filters whose member
//!   sets are updated on every structural change, never rescanned.
//! - [`World`]: owns the above and routes each change to the queries that
//!   care about it.
//!
//! ## Iterating while mutating
//!
//! Iterating a query locks it. Membership changes that reach a locked query
//! are queued and replayed, in order, when the last lock is released, so a
//! loop may add, remove and destroy freely:
//!
//! ```rust
//! use engine_ecs::{Component, World};
//!
//! #[derive(Debug, Default)]
//! struct Health(i32);
//! impl Component for Health {}
//!
//! let mut world = World::new();
//! let query = world.query().with_all::<Health>().build();
//! for hp in [0, 5, 0] {
//!     let entity = world.create_entity();
//!     world.insert_component(entity, Health(hp)).unwrap();
//! }
//!
//! for entity in &query {
//!     if world.get_component::<Health>(entity).unwrap().0 == 0 {
//!         world.destroy_entity(entity).unwrap();
//!     }
//! }
//! assert_eq!(query.len(), 1);
//! ```

pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod query;
pub mod storage;
pub mod world;

pub use component::{Component, ComponentId};
pub use config::WorldConfig;
pub use entity::{Allocation, Entity, EntityTable};
pub use error::{EcsError, Result};
pub use events::{ListenerId, Listeners, WorldEvents};
pub use query::{Query, QueryDesc, QueryId, QueryIter};
pub use storage::{ComponentRef, ComponentStore};
pub use world::{QueryBuilder, Store, World};
