//! Sparse-set component storage.
//!
//! Each component kind gets one [`ComponentStore`]: a dense array of values
//! plus an entity-indexed sparse array pointing into it.
//!
//! ```text
//! sparse: [ 0, 3, 0, 1, 2, 0 ]      entity -> dense slot (0 = absent)
//! dense:  [ -, e3, e4, e1 ]          slot 0 is a reserved sentinel
//! free:   [ ]                        recycled dense slots
//! ```
//!
//! Removal never compacts `dense`: the slot goes onto the free list and the
//! next addition reuses it. Dense order therefore says nothing about
//! insertion order and must not be used for iteration.

use std::any::Any;
use std::fmt;

use crate::component::{Component, ComponentId};
use crate::entity::Entity;

/// Storage for every instance of one component kind.
#[derive(Debug)]
pub struct ComponentStore<T: Component> {
    id: ComponentId,
    /// Component values. Index 0 is never handed out.
    dense: Vec<T>,
    /// Entity index -> dense slot, `0` meaning absent.
    sparse: Vec<u32>,
    /// Dense slots released by removals.
    free: Vec<u32>,
}

impl<T: Component> ComponentStore<T> {
    /// Creates an empty store whose sparse array covers `entity_capacity`
    /// entities.
    #[must_use]
    pub fn new(id: ComponentId, entity_capacity: usize) -> Self {
        let mut dense = Vec::with_capacity(entity_capacity / 4 + 1);
        dense.push(T::default());
        Self {
            id,
            dense,
            sparse: vec![0; entity_capacity],
            free: Vec::with_capacity(entity_capacity / 8),
        }
    }

    /// The component kind stored here.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Number of entities that currently own a `T`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len() - 1 - self.free.len()
    }

    /// Returns `true` if no entity owns a `T`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        match self.sparse.get(entity.index()) {
            Some(&slot) if slot != 0 => Some(slot as usize),
            _ => None,
        }
    }

    /// Returns `true` if `entity` owns a `T`.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Returns the value owned by `entity`.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|slot| &self.dense[slot])
    }

    /// Returns the value owned by `entity` for in-place mutation.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(|slot| &mut self.dense[slot])
    }

    /// Stores `value` for `entity`, reusing a free slot when one exists.
    ///
    /// The caller guarantees `entity` is in range and has no `T` yet.
    pub(crate) fn attach(&mut self, entity: Entity, value: T) {
        debug_assert!(!self.contains(entity), "{entity} already has a {}", T::type_name());
        let slot = match self.free.pop() {
            Some(slot) => {
                self.dense[slot as usize] = value;
                slot
            }
            None => {
                self.dense.push(value);
                (self.dense.len() - 1) as u32
            }
        };
        self.sparse[entity.index()] = slot;
    }

    /// Releases the slot owned by `entity`, returning the value it held.
    ///
    /// The slot is reset to `T::default()` and pushed onto the free list.
    pub(crate) fn detach(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index()] = 0;
        self.free.push(slot as u32);
        Some(std::mem::take(&mut self.dense[slot]))
    }

    /// Grows the sparse array to `capacity`. Never shrinks.
    pub fn resize(&mut self, capacity: usize) {
        if capacity > self.sparse.len() {
            self.sparse.resize(capacity, 0);
        }
    }
}

/// The per-kind capability the world needs without knowing `T`.
pub(crate) trait ErasedStore: fmt::Debug {
    fn id(&self) -> ComponentId;
    fn type_name(&self) -> &'static str;
    fn contains(&self, entity: Entity) -> bool;
    /// Drops the component owned by `entity`; `false` if there was none.
    fn remove_erased(&mut self, entity: Entity) -> bool;
    fn resize(&mut self, capacity: usize);
    fn value(&self, entity: Entity) -> Option<(&dyn Any, &dyn fmt::Debug)>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentStore::contains(self, entity)
    }

    fn remove_erased(&mut self, entity: Entity) -> bool {
        self.detach(entity).is_some()
    }

    fn resize(&mut self, capacity: usize) {
        ComponentStore::resize(self, capacity);
    }

    fn value(&self, entity: Entity) -> Option<(&dyn Any, &dyn fmt::Debug)> {
        self.get(entity)
            .map(|value| (value as &dyn Any, value as &dyn fmt::Debug))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A type-erased view of one component attached to an entity.
pub struct ComponentRef<'w> {
    /// The component kind.
    pub id: ComponentId,
    /// The component's [`Component::type_name`].
    pub name: &'static str,
    value: &'w dyn Any,
    debug: &'w dyn fmt::Debug,
}

impl<'w> ComponentRef<'w> {
    pub(crate) fn new(
        id: ComponentId,
        name: &'static str,
        (value, debug): (&'w dyn Any, &'w dyn fmt::Debug),
    ) -> Self {
        Self {
            id,
            name,
            value,
            debug,
        }
    }

    /// Returns the value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&'w T> {
        self.value.downcast_ref()
    }
}

impl fmt::Debug for ComponentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("value", self.debug)
            .finish()
    }
}
