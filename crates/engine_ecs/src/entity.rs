//! Entity identifiers and the generation-tracking entity table.
//!
//! An [`Entity`] is a plain `u32` index with no data of its own. Liveness is
//! tracked by the [`EntityTable`], which pairs every allocated index with a
//! signed generation counter ("version"):
//!
//! - `version > 0`: the entity is alive.
//! - `version <= 0`: the index is free (recycled and waiting for reuse).
//!
//! Destroying an entity negates and advances its version, and recreating a
//! recycled index flips it positive again, so no `(index, version)` pair is
//! handed out twice in a row.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers. Components are attached to them through the
/// world's component stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// Create an entity from a raw index.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the identifier as an array index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Per-index bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
struct EntityRecord {
    version: i16,
    component_count: u32,
    destroying: bool,
}

/// The result of [`EntityTable::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The freshly allocated (or recycled) entity.
    pub entity: Entity,
    /// The new table capacity, if the allocation had to grow the table.
    pub grown_to: Option<usize>,
}

/// Owns the set of live entities and their generation counters.
///
/// Indices are handed out sequentially until the table is full, at which
/// point the capacity doubles. Destroyed indices go onto a recycle list and
/// are reused (most recently destroyed first) before any new index is
/// allocated.
#[derive(Debug)]
pub struct EntityTable {
    /// One record per slot; `records.len()` is the capacity.
    records: Vec<EntityRecord>,
    /// Number of indices ever allocated. Indices `>= allocated` are unused.
    allocated: usize,
    /// Destroyed indices awaiting reuse.
    recycled: Vec<Entity>,
}

impl EntityTable {
    /// Creates a table with room for `capacity` entities before the first
    /// growth.
    #[must_use]
    pub fn new(capacity: usize, recycled_capacity: usize) -> Self {
        Self {
            records: vec![EntityRecord::default(); capacity.max(1)],
            allocated: 0,
            recycled: Vec::with_capacity(recycled_capacity),
        }
    }

    /// Returns the current capacity (the length of every entity-indexed array
    /// in the world).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Returns the number of indices allocated so far, live or recycled.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.allocated - self.recycled.len()
    }

    /// Returns `true` if no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates an entity, preferring recycled indices.
    ///
    /// A recycled index has its version flipped back to positive. A new index
    /// starts at version 1; if the table is full its capacity doubles first,
    /// which is reported through [`Allocation::grown_to`] so the owner can
    /// resize every entity-indexed array in lockstep.
    pub fn allocate(&mut self) -> Allocation {
        if let Some(entity) = self.recycled.pop() {
            let record = &mut self.records[entity.index()];
            record.version = -record.version;
            record.component_count = 0;
            record.destroying = false;
            return Allocation {
                entity,
                grown_to: None,
            };
        }

        let mut grown_to = None;
        if self.allocated == self.records.len() {
            let new_capacity = self.records.len() * 2;
            self.records.resize(new_capacity, EntityRecord::default());
            grown_to = Some(new_capacity);
        }

        let entity = Entity(self.allocated as u32);
        self.allocated += 1;
        self.records[entity.index()] = EntityRecord {
            version: 1,
            ..EntityRecord::default()
        };
        Allocation { entity, grown_to }
    }

    fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records[..self.allocated].get(entity.index())
    }

    fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records[..self.allocated].get_mut(entity.index())
    }

    /// Returns `true` if `entity` lies within the allocated range, whether or
    /// not it is currently alive.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        entity.index() < self.allocated
    }

    /// Returns `true` if `entity` is in range and its version is positive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.record(entity).is_some_and(|r| r.version > 0)
    }

    /// Returns the version of `entity`, or `None` if it was never allocated.
    #[must_use]
    pub fn version(&self, entity: Entity) -> Option<i16> {
        self.record(entity).map(|r| r.version)
    }

    /// Returns the number of components attached to `entity`.
    #[must_use]
    pub fn component_count(&self, entity: Entity) -> Option<u32> {
        self.record(entity).map(|r| r.component_count)
    }

    /// Returns `true` while `entity` is being stripped by a destroy call.
    #[must_use]
    pub fn is_destroying(&self, entity: Entity) -> bool {
        self.record(entity).is_some_and(|r| r.destroying)
    }

    /// Iterates over every live entity in index order.
    pub fn alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records[..self.allocated]
            .iter()
            .enumerate()
            .filter(|(_, r)| r.version > 0)
            .map(|(i, _)| Entity(i as u32))
    }

    pub(crate) fn add_component(&mut self, entity: Entity) {
        if let Some(record) = self.record_mut(entity) {
            record.component_count += 1;
        }
    }

    /// Decrements the component count and returns what remains.
    pub(crate) fn remove_component(&mut self, entity: Entity) -> u32 {
        match self.record_mut(entity) {
            Some(record) => {
                debug_assert!(record.component_count > 0, "{entity} has no components");
                record.component_count = record.component_count.saturating_sub(1);
                record.component_count
            }
            None => 0,
        }
    }

    pub(crate) fn mark_destroying(&mut self, entity: Entity) {
        if let Some(record) = self.record_mut(entity) {
            record.destroying = true;
        }
    }

    /// Finalizes a destruction: negates and advances the version and pushes
    /// the index onto the recycle list.
    pub(crate) fn release(&mut self, entity: Entity) {
        let Some(record) = self.record_mut(entity) else {
            return;
        };
        debug_assert!(record.version > 0, "{entity} released twice");
        debug_assert_eq!(record.component_count, 0);
        record.version = if record.version == i16::MAX {
            -1
        } else {
            -(record.version + 1)
        };
        record.destroying = false;
        self.recycled.push(entity);
    }
}
