//! The [`World`]: entity lifecycle, component stores and query routing.
//!
//! The world owns the entity table, one [`ComponentStore`] per component kind
//! and every [`Query`]. Component stores never talk to queries directly: each
//! structural change goes through the world, which fans it out to the
//! queries subscribed to that component kind.
//!
//! For every component kind the world keeps three subscriber lists, one per
//! filter term. On **add** of kind `K` to entity `e`:
//!
//! - queries with `K` in `all` or `any` gain `e` if it now fully matches,
//! - queries with `K` in `none` lose `e`.
//!
//! On **remove** of `K`:
//!
//! - queries with `K` in `all` lose `e`,
//! - queries with `K` in `any` lose `e` unless another `any` term still holds,
//! - queries with `K` in `none` gain `e` if it now fully matches.
//!
//! ## Empty entities
//!
//! A created entity is alive even with no components, and removing its last
//! component leaves it alive. Such entities belong to every query whose `all`
//! and `any` terms are empty, so creation and finalization are routed to
//! those queries too. Only [`World::destroy_entity`] kills an entity.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::component::{Component, ComponentId};
use crate::config::WorldConfig;
use crate::entity::{Allocation, Entity, EntityTable};
use crate::error::{EcsError, Result};
use crate::events::WorldEvents;
use crate::query::{Query, QueryDesc, QueryId};
use crate::storage::{ComponentRef, ComponentStore, ErasedStore};

/// Queries subscribed to one component kind, by filter term.
#[derive(Debug, Default)]
struct Routes {
    all: Vec<QueryId>,
    any: Vec<QueryId>,
    none: Vec<QueryId>,
}

/// Entities, their components, and the queries over them.
#[derive(Debug)]
pub struct World {
    name: String,
    /// User state shared by everything holding the world.
    shared: Option<Box<dyn Any>>,
    config: WorldConfig,
    entities: EntityTable,
    /// Indexed by [`ComponentId`].
    stores: Vec<Box<dyn ErasedStore>>,
    store_ids: FxHashMap<TypeId, ComponentId>,
    /// Indexed by [`ComponentId`]; may be longer than `stores` when a query
    /// names an id no store has been registered for yet.
    routes: Vec<Routes>,
    /// Indexed by [`QueryId`].
    queries: Vec<Query>,
    /// Queries an entity without components can belong to.
    unfiltered: Vec<QueryId>,
    query_cache: FxHashMap<u64, Vec<QueryId>>,
    desc_pool: Vec<QueryDesc>,
    events: WorldEvents,
}

impl World {
    /// Create a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create a world with explicit initial capacities.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        let config = config.normalized();
        Self {
            name: String::from("world"),
            shared: None,
            config,
            entities: EntityTable::new(config.entity_capacity, config.recycled_capacity),
            stores: Vec::new(),
            store_ids: FxHashMap::default(),
            routes: Vec::new(),
            queries: Vec::new(),
            unfiltered: Vec::new(),
            query_cache: FxHashMap::with_capacity_and_hasher(
                config.query_capacity,
                Default::default(),
            ),
            desc_pool: Vec::new(),
            events: WorldEvents::default(),
        }
    }

    /// Sets the name used to tell worlds apart in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attaches a shared context value, replacing any previous one.
    #[must_use]
    pub fn with_shared<S: Any>(mut self, shared: S) -> Self {
        self.set_shared(shared);
        self
    }

    /// The world's name, `"world"` unless set with [`World::with_name`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the shared context value.
    pub fn set_shared<S: Any>(&mut self, shared: S) {
        debug!(world = %self.name, ty = std::any::type_name::<S>(), "attached shared context");
        self.shared = Some(Box::new(shared));
    }

    /// The shared context, if one is attached and it is an `S`.
    #[must_use]
    pub fn shared<S: Any>(&self) -> Option<&S> {
        self.shared.as_deref()?.downcast_ref()
    }

    /// Mutable access to the shared context, if it is an `S`.
    pub fn shared_mut<S: Any>(&mut self) -> Option<&mut S> {
        self.shared.as_deref_mut()?.downcast_mut()
    }

    /// The configuration this world was created with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Notification lists.
    #[must_use]
    pub fn events(&self) -> &WorldEvents {
        &self.events
    }

    /// Notification lists, for subscribing and unsubscribing.
    pub fn events_mut(&mut self) -> &mut WorldEvents {
        &mut self.events
    }

    // -- Entity lifecycle --

    /// Size of every entity-indexed array.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Creates an entity with no components.
    ///
    /// Recycled indices are reused first. When a new index does not fit, the
    /// capacity doubles and every store and query is resized before the
    /// entity is handed out.
    pub fn create_entity(&mut self) -> Entity {
        let Allocation { entity, grown_to } = self.entities.allocate();
        if let Some(capacity) = grown_to {
            self.grow(capacity);
        }

        for &id in &self.unfiltered {
            let query = &self.queries[id.index()];
            if !query.contains_logical(entity) {
                query.insert(entity);
            }
        }

        trace!(%entity, "created entity");
        self.events.entity_created.emit(&entity);
        entity
    }

    /// Destroys an entity.
    ///
    /// An entity without components is finalized immediately: its version is
    /// negated and advanced and its index recycled. Otherwise every component
    /// is removed one by one through the normal removal path, and the
    /// entity is finalized inside the last removal. Destroying an already
    /// destroyed entity does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` was never allocated.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        if !self.entities.contains(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }
        if !self.entities.is_alive(entity) || self.entities.is_destroying(entity) {
            return Ok(());
        }

        if self.entities.component_count(entity) == Some(0) {
            self.finalize(entity);
            return Ok(());
        }

        self.entities.mark_destroying(entity);
        for index in 0..self.stores.len() {
            if self.stores[index].remove_erased(entity) {
                self.on_component_removed(entity, ComponentId(index as u32));
            }
        }
        debug_assert!(!self.entities.is_alive(entity), "{entity} survived destruction");
        Ok(())
    }

    /// Returns `true` if `entity` is allocated and alive.
    #[must_use]
    pub fn is_entity_valid(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of components attached to `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` was never allocated.
    pub fn entity_component_count(&self, entity: Entity) -> Result<u32> {
        self.entities
            .component_count(entity)
            .ok_or(EcsError::InvalidEntity(entity))
    }

    /// The generation of `entity`'s index: positive while alive, non-positive
    /// once recycled.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` was never allocated.
    pub fn entity_version(&self, entity: Entity) -> Result<i16> {
        self.entities
            .version(entity)
            .ok_or(EcsError::InvalidEntity(entity))
    }

    /// Returns `true` if `entity` is alive and still at `version`, i.e. a
    /// remembered `(entity, version)` pair has not gone stale.
    #[must_use]
    pub fn is_version_current(&self, entity: Entity, version: i16) -> bool {
        version > 0 && self.entities.version(entity) == Some(version)
    }

    /// Iterates over every live entity in index order.
    pub fn alive_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.alive()
    }

    /// Destroys every live entity. Stores and queries stay registered.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`World::destroy_entity`].
    pub fn clear(&mut self) -> Result<()> {
        let alive: Vec<Entity> = self.entities.alive().collect();
        debug!(entities = alive.len(), "clearing world");
        for entity in alive {
            self.destroy_entity(entity)?;
        }
        Ok(())
    }

    fn check_alive(&self, entity: Entity) -> Result<()> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity(entity))
        }
    }

    fn grow(&mut self, capacity: usize) {
        for store in &mut self.stores {
            store.resize(capacity);
        }
        for query in &self.queries {
            query.resize(capacity);
        }
        debug!(capacity, "grew entity capacity");
        self.events.resized.emit(&capacity);
    }

    fn finalize(&mut self, entity: Entity) {
        for &id in &self.unfiltered {
            let query = &self.queries[id.index()];
            if query.contains_logical(entity) {
                query.remove(entity);
            }
        }
        self.entities.release(entity);
        trace!(%entity, "destroyed entity");
        self.events.entity_destroyed.emit(&entity);
    }

    // -- Component kinds --

    /// Returns the id of component kind `T`, registering its store on first
    /// use.
    pub fn component_id<T: Component>(&mut self) -> ComponentId {
        if let Some(&id) = self.store_ids.get(&TypeId::of::<T>()) {
            return id;
        }

        let id = ComponentId(self.stores.len() as u32);
        self.stores
            .push(Box::new(ComponentStore::<T>::new(id, self.entities.capacity())));
        if self.routes.len() <= id.index() {
            self.routes.resize_with(id.index() + 1, Routes::default);
        }
        self.store_ids.insert(TypeId::of::<T>(), id);
        debug!(component = T::type_name(), id = id.0, "registered component kind");
        id
    }

    /// Returns the id of `T` if its store exists.
    #[must_use]
    pub fn registered_component_id<T: Component>(&self) -> Option<ComponentId> {
        self.store_ids.get(&TypeId::of::<T>()).copied()
    }

    /// The [`Component::type_name`] of a registered kind.
    #[must_use]
    pub fn component_name(&self, id: ComponentId) -> Option<&'static str> {
        self.stores.get(id.index()).map(|store| store.type_name())
    }

    /// Number of registered component kinds.
    #[must_use]
    pub fn component_kinds(&self) -> usize {
        self.stores.len()
    }

    /// Typed access to the store for `T`, created on first use.
    pub fn store<T: Component>(&mut self) -> Store<'_, T> {
        let id = self.component_id::<T>();
        Store {
            world: self,
            id,
            _marker: PhantomData,
        }
    }

    /// Every component attached to `entity`, in component-id order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` is not alive.
    pub fn components(&self, entity: Entity) -> Result<Vec<ComponentRef<'_>>> {
        self.check_alive(entity)?;
        Ok(self
            .stores
            .iter()
            .filter_map(|store| {
                store
                    .value(entity)
                    .map(|value| ComponentRef::new(store.id(), store.type_name(), value))
            })
            .collect())
    }

    /// The ids of every component attached to `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` is not alive.
    pub fn component_ids(&self, entity: Entity) -> Result<Vec<ComponentId>> {
        self.check_alive(entity)?;
        Ok(self
            .stores
            .iter()
            .filter(|store| store.contains(entity))
            .map(|store| store.id())
            .collect())
    }

    // -- Typed component shortcuts --

    /// Attaches a default `T` to `entity`. See [`Store::add`].
    ///
    /// # Errors
    ///
    /// See [`Store::add`].
    pub fn add_component<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        let id = self.component_id::<T>();
        self.attach(id, entity, T::default())
    }

    /// Attaches `value` to `entity`. See [`Store::insert`].
    ///
    /// # Errors
    ///
    /// See [`Store::insert`].
    pub fn insert_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        let id = self.component_id::<T>();
        self.attach(id, entity, value)
    }

    /// See [`Store::get`].
    ///
    /// # Errors
    ///
    /// See [`Store::get`].
    pub fn get_component<T: Component>(&mut self, entity: Entity) -> Result<&T> {
        let id = self.component_id::<T>();
        self.component_ref(id, entity)
    }

    /// See [`Store::get_mut`].
    ///
    /// # Errors
    ///
    /// See [`Store::get_mut`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        let id = self.component_id::<T>();
        self.component_mut(id, entity)
    }

    /// See [`Store::set`].
    ///
    /// # Errors
    ///
    /// See [`Store::set`].
    pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        *self.get_component_mut(entity)? = value;
        Ok(())
    }

    /// See [`Store::has`].
    ///
    /// # Errors
    ///
    /// See [`Store::has`].
    pub fn has_component<T: Component>(&mut self, entity: Entity) -> Result<bool> {
        let id = self.component_id::<T>();
        self.check_alive(entity)?;
        Ok(self.storage::<T>(id).contains(entity))
    }

    /// See [`Store::remove`].
    ///
    /// # Errors
    ///
    /// See [`Store::remove`].
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<Option<T>> {
        let id = self.component_id::<T>();
        self.detach(id, entity)
    }

    fn storage<T: Component>(&self, id: ComponentId) -> &ComponentStore<T> {
        match self.stores[id.index()].as_any().downcast_ref() {
            Some(store) => store,
            None => unreachable!("{id} is not the store of `{}`", T::type_name()),
        }
    }

    fn storage_mut<T: Component>(&mut self, id: ComponentId) -> &mut ComponentStore<T> {
        match self.stores[id.index()].as_any_mut().downcast_mut() {
            Some(store) => store,
            None => unreachable!("{id} is not the store of `{}`", T::type_name()),
        }
    }

    fn attach<T: Component>(&mut self, id: ComponentId, entity: Entity, value: T) -> Result<&mut T> {
        self.check_alive(entity)?;
        if self.storage::<T>(id).contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: T::type_name(),
            });
        }

        self.storage_mut::<T>(id).attach(entity, value);
        self.on_component_added(entity, id);
        self.component_mut(id, entity)
    }

    fn component_ref<T: Component>(&self, id: ComponentId, entity: Entity) -> Result<&T> {
        self.check_alive(entity)?;
        self.storage::<T>(id)
            .get(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::type_name(),
            })
    }

    fn component_mut<T: Component>(&mut self, id: ComponentId, entity: Entity) -> Result<&mut T> {
        self.check_alive(entity)?;
        self.storage_mut::<T>(id)
            .get_mut(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::type_name(),
            })
    }

    fn detach<T: Component>(&mut self, id: ComponentId, entity: Entity) -> Result<Option<T>> {
        self.check_alive(entity)?;
        let removed = self.storage_mut::<T>(id).detach(entity);
        if removed.is_some() {
            self.on_component_removed(entity, id);
        }
        Ok(removed)
    }

    // -- Query routing --

    /// Evaluates `desc` against the stores. An entity that is being destroyed
    /// matches nothing.
    fn matches(&self, desc: &QueryDesc, entity: Entity) -> bool {
        !self.entities.is_destroying(entity)
            && desc.matches(|id| {
                self.stores
                    .get(id.index())
                    .is_some_and(|store| store.contains(entity))
            })
    }

    fn on_component_added(&mut self, entity: Entity, id: ComponentId) {
        let routes = &self.routes[id.index()];
        for &query_id in routes.all.iter().chain(&routes.any) {
            let query = &self.queries[query_id.index()];
            if !query.contains_logical(entity) && self.matches(query.desc(), entity) {
                query.insert(entity);
            }
        }
        for &query_id in &routes.none {
            let query = &self.queries[query_id.index()];
            if query.contains_logical(entity) {
                query.remove(entity);
            }
        }

        self.entities.add_component(entity);
        trace!(%entity, component = %id, "component added");
        self.events.component_added.emit(&(entity, id));
    }

    fn on_component_removed(&mut self, entity: Entity, id: ComponentId) {
        let routes = &self.routes[id.index()];
        for &query_id in &routes.all {
            let query = &self.queries[query_id.index()];
            if query.contains_logical(entity) {
                query.remove(entity);
            }
        }
        for &query_id in &routes.any {
            let query = &self.queries[query_id.index()];
            if query.contains_logical(entity) && !self.matches(query.desc(), entity) {
                query.remove(entity);
            }
        }
        for &query_id in &routes.none {
            let query = &self.queries[query_id.index()];
            if !query.contains_logical(entity) && self.matches(query.desc(), entity) {
                query.insert(entity);
            }
        }

        let remaining = self.entities.remove_component(entity);
        trace!(%entity, component = %id, remaining, "component removed");
        self.events.component_removed.emit(&(entity, id));

        if remaining == 0 && self.entities.is_destroying(entity) {
            self.finalize(entity);
        }
    }

    // -- Queries --

    /// A fresh descriptor, recycled from earlier cache hits when possible.
    pub fn query_desc(&mut self) -> QueryDesc {
        self.desc_pool.pop().unwrap_or_default()
    }

    /// Starts a typed query builder.
    pub fn query(&mut self) -> QueryBuilder<'_> {
        let desc = self.query_desc();
        QueryBuilder { world: self, desc }
    }

    /// Returns the query for `desc`, creating it on first request.
    ///
    /// Descriptors are canonicalized first, so filters with the same terms
    /// share one query no matter how they were assembled. On a cache hit the
    /// descriptor is reset and pooled for [`World::query_desc`], keeping at
    /// most `query_capacity` of them. A new query is subscribed to every
    /// component kind it names and seeded by scanning all live entities once.
    pub fn get_query(&mut self, desc: QueryDesc) -> Query {
        let mut desc = if desc.is_built() { desc } else { desc.build() };

        if let Some(query) = self.cached_query(&desc) {
            trace!(query = %query.id(), "query cache hit");
            if self.desc_pool.len() < self.config.query_capacity {
                desc.reset();
                self.desc_pool.push(desc);
            }
            return query;
        }

        let id = QueryId(self.queries.len() as u32);
        let referenced = desc
            .all()
            .iter()
            .chain(desc.any())
            .chain(desc.none())
            .map(|component| component.index() + 1)
            .max()
            .unwrap_or(0);
        if self.routes.len() < referenced {
            self.routes.resize_with(referenced, Routes::default);
        }
        for component in desc.all() {
            self.routes[component.index()].all.push(id);
        }
        for component in desc.any() {
            self.routes[component.index()].any.push(id);
        }
        for component in desc.none() {
            self.routes[component.index()].none.push(id);
        }
        if desc.matches_empty() {
            self.unfiltered.push(id);
        }

        let capacity = self.entities.capacity();
        let signature = desc.signature();
        let query = Query::new(id, desc, capacity / 4, capacity);
        for entity in self.entities.alive() {
            if self.matches(query.desc(), entity) {
                query.insert(entity);
            }
        }

        self.query_cache.entry(signature).or_default().push(id);
        self.queries.push(query.clone());
        debug!(query = %id, members = query.len(), "created query");
        self.events.query_created.emit(&query);
        query
    }

    fn cached_query(&self, desc: &QueryDesc) -> Option<Query> {
        self.query_cache
            .get(&desc.signature())?
            .iter()
            .map(|id| &self.queries[id.index()])
            .find(|query| query.desc().same_terms(desc))
            .cloned()
    }

    /// Every query created so far, in creation order.
    #[must_use]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Number of distinct queries.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed handle to the store of component kind `T`.
///
/// Obtained from [`World::store`]. Every operation validates the entity
/// first and routes structural changes through the world so queries stay
/// current.
#[derive(Debug)]
pub struct Store<'w, T: Component> {
    world: &'w mut World,
    id: ComponentId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> Store<'_, T> {
    /// The component kind behind this store.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Number of entities owning a `T`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.world.storage::<T>(self.id).len()
    }

    /// Returns `true` if no entity owns a `T`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attaches `T::default()` and returns it for in-place initialization.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidEntity`] if `entity` is not alive.
    /// - [`EcsError::DuplicateComponent`] if `entity` already has a `T`.
    pub fn add(&mut self, entity: Entity) -> Result<&mut T> {
        self.world.attach(self.id, entity, T::default())
    }

    /// Attaches `value`.
    ///
    /// # Errors
    ///
    /// Same as [`Store::add`].
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        self.world.attach(self.id, entity, value)
    }

    /// Reads the `T` owned by `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidEntity`] if `entity` is not alive.
    /// - [`EcsError::MissingComponent`] if `entity` has no `T`.
    pub fn get(&self, entity: Entity) -> Result<&T> {
        self.world.component_ref(self.id, entity)
    }

    /// Borrows the `T` owned by `entity` for in-place mutation.
    ///
    /// # Errors
    ///
    /// Same as [`Store::get`].
    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T> {
        self.world.component_mut(self.id, entity)
    }

    /// Runs `f` on the `T` owned by `entity` and returns its result.
    ///
    /// # Errors
    ///
    /// Same as [`Store::get`].
    pub fn mutate<R>(&mut self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.get_mut(entity).map(f)
    }

    /// Overwrites the `T` owned by `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`Store::get`].
    pub fn set(&mut self, entity: Entity, value: T) -> Result<()> {
        *self.get_mut(entity)? = value;
        Ok(())
    }

    /// Returns `true` if `entity` owns a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` is not alive.
    pub fn has(&self, entity: Entity) -> Result<bool> {
        self.world.check_alive(entity)?;
        Ok(self.world.storage::<T>(self.id).contains(entity))
    }

    /// Detaches the `T` owned by `entity` and returns it. Removing a
    /// component the entity does not have is a no-op returning `None`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidEntity`] if `entity` is not alive.
    pub fn remove(&mut self, entity: Entity) -> Result<Option<T>> {
        self.world.detach(self.id, entity)
    }
}

/// Builds a query from component types. Obtained from [`World::query`].
#[derive(Debug)]
pub struct QueryBuilder<'w> {
    world: &'w mut World,
    desc: QueryDesc,
}

impl QueryBuilder<'_> {
    /// Require a `T`.
    #[must_use]
    pub fn with_all<T: Component>(mut self) -> Self {
        let id = self.world.component_id::<T>();
        self.desc = self.desc.with_all([id]);
        self
    }

    /// Accept entities with a `T` (at least one `any` term must hold).
    #[must_use]
    pub fn with_any<T: Component>(mut self) -> Self {
        let id = self.world.component_id::<T>();
        self.desc = self.desc.with_any([id]);
        self
    }

    /// Exclude entities with a `T`.
    #[must_use]
    pub fn with_none<T: Component>(mut self) -> Self {
        let id = self.world.component_id::<T>();
        self.desc = self.desc.with_none([id]);
        self
    }

    /// Canonicalizes the filter and fetches or creates the query.
    pub fn build(self) -> Query {
        self.world.get_query(self.desc.build())
    }
}
