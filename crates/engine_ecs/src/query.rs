//! Query descriptors and incrementally maintained query membership.
//!
//! A [`QueryDesc`] is a boolean component-presence filter with three terms:
//!
//! - **all**: every listed component must be present,
//! - **any**: at least one listed component must be present (ignored when
//!   empty),
//! - **none**: no listed component may be present.
//!
//! A [`Query`] is the live set of entities matching one descriptor. The world
//! seeds it once by scanning every entity when the query is created and from
//! then on only patches it from individual component add/remove events.
//!
//! ## Iteration and deferred changes
//!
//! Iterating a query locks it. While the lock count is nonzero, membership
//! changes are queued instead of applied and are replayed in submission order
//! when the last lock is released. An iteration therefore always sees a
//! stable snapshot, even when the loop body adds or removes components on the
//! entities it visits.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::error;

use crate::component::ComponentId;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::events::{ListenerId, Listeners};

/// Identifies a query within its world, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u32);

impl QueryId {
    /// Returns the identifier as an array index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query({})", self.0)
    }
}

const SIGNATURE_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const ALL_MIX: u64 = 0x0100_0000_01b3;
const ANY_MIX: u64 = 0x9e37_79b9_7f4a_7c15;
const NONE_MIX: u64 = 0xc2b2_ae3d_27d4_eb4f;

fn mix(hash: u64, ids: &[ComponentId], multiplier: u64) -> u64 {
    ids.iter()
        .fold(hash, |h, id| (h ^ u64::from(id.0)).wrapping_mul(multiplier))
}

/// A component-presence filter.
///
/// Build one with the `with_*` methods and canonicalize it with
/// [`QueryDesc::build`]. Two descriptors with the same three id sets end up
/// with the same [`signature`](QueryDesc::signature) regardless of the order
/// ids were added in.
#[derive(Debug, Clone, Default)]
pub struct QueryDesc {
    all: Vec<ComponentId>,
    any: Vec<ComponentId>,
    none: Vec<ComponentId>,
    signature: u64,
    built: bool,
}

impl QueryDesc {
    /// Create a new empty descriptor. An empty descriptor matches every
    /// live entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every component in `ids`.
    #[must_use]
    pub fn with_all(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.all.extend(ids);
        self.built = false;
        self
    }

    /// Require at least one component in `ids`.
    #[must_use]
    pub fn with_any(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.any.extend(ids);
        self.built = false;
        self
    }

    /// Exclude every component in `ids`.
    #[must_use]
    pub fn with_none(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.none.extend(ids);
        self.built = false;
        self
    }

    /// Sorts and deduplicates each term and computes the signature.
    #[must_use]
    pub fn build(mut self) -> Self {
        for ids in [&mut self.all, &mut self.any, &mut self.none] {
            ids.sort_unstable();
            ids.dedup();
        }

        let counts = (self.all.len() as u64)
            ^ ((self.any.len() as u64) << 21)
            ^ ((self.none.len() as u64) << 42);
        let hash = mix(SIGNATURE_BASIS ^ counts, &self.all, ALL_MIX);
        let hash = mix(hash, &self.any, ANY_MIX);
        self.signature = mix(hash, &self.none, NONE_MIX);
        self.built = true;
        self
    }

    /// Clears every term so the descriptor can be reused.
    pub fn reset(&mut self) {
        self.all.clear();
        self.any.clear();
        self.none.clear();
        self.signature = 0;
        self.built = false;
    }

    /// Returns `true` once [`build`](Self::build) has run since the last
    /// change.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// The order-independent hash of the three terms. Only meaningful after
    /// [`build`](Self::build).
    #[must_use]
    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Required components.
    #[must_use]
    pub fn all(&self) -> &[ComponentId] {
        &self.all
    }

    /// Alternative components (at least one required).
    #[must_use]
    pub fn any(&self) -> &[ComponentId] {
        &self.any
    }

    /// Excluded components.
    #[must_use]
    pub fn none(&self) -> &[ComponentId] {
        &self.none
    }

    /// Returns `true` if an entity with no components at all satisfies this
    /// filter, i.e. both `all` and `any` are empty.
    #[must_use]
    pub fn matches_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Evaluates the filter against a presence test.
    pub fn matches(&self, has: impl Fn(ComponentId) -> bool) -> bool {
        self.all.iter().all(|&id| has(id))
            && !self.none.iter().any(|&id| has(id))
            && (self.any.is_empty() || self.any.iter().any(|&id| has(id)))
    }

    /// Returns `true` if both descriptors have identical terms.
    #[must_use]
    pub fn same_terms(&self, other: &QueryDesc) -> bool {
        self.all == other.all && self.any == other.any && self.none == other.none
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredOp {
    Add(Entity),
    Remove(Entity),
}

/// Dense/sparse membership arrays plus the lock state.
#[derive(Debug)]
struct Membership {
    dense: Vec<Entity>,
    /// Entity index -> position in `dense` + 1, `0` meaning not a member.
    sparse: Vec<u32>,
    lock_count: u32,
    deferred: Vec<DeferredOp>,
    /// Membership as it will be once `deferred` is replayed.
    pending: FxHashMap<Entity, bool>,
}

impl Membership {
    fn new(query_capacity: usize, entity_capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(query_capacity),
            sparse: vec![0; entity_capacity],
            lock_count: 0,
            deferred: Vec::with_capacity(query_capacity),
            pending: FxHashMap::default(),
        }
    }

    fn contains(&self, entity: Entity) -> bool {
        self.sparse.get(entity.index()).is_some_and(|&pos| pos != 0)
    }

    fn contains_logical(&self, entity: Entity) -> bool {
        match self.pending.get(&entity) {
            Some(&member) => member,
            None => self.contains(entity),
        }
    }

    fn push(&mut self, entity: Entity) {
        debug_assert!(!self.contains(entity), "{entity} is already a member");
        self.dense.push(entity);
        self.sparse[entity.index()] = self.dense.len() as u32;
    }

    fn swap_remove(&mut self, entity: Entity) {
        debug_assert!(self.contains(entity), "{entity} is not a member");
        let pos = self.sparse[entity.index()] as usize - 1;
        self.sparse[entity.index()] = 0;
        self.dense.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.sparse[moved.index()] = pos as u32 + 1;
        }
    }

    fn defer(&mut self, op: DeferredOp) {
        let (entity, member) = match op {
            DeferredOp::Add(entity) => (entity, true),
            DeferredOp::Remove(entity) => (entity, false),
        };
        self.pending.insert(entity, member);
        self.deferred.push(op);
    }
}

struct QueryShared {
    id: QueryId,
    desc: QueryDesc,
    membership: RefCell<Membership>,
    added: RefCell<Listeners<Entity>>,
    removed: RefCell<Listeners<Entity>>,
}

/// The live set of entities matching a [`QueryDesc`].
///
/// `Query` is a cheap, clonable handle; the world keeps one clone for
/// routing and hands others out from [`World::get_query`](crate::World::get_query).
/// Holding a handle does not borrow the world, so a loop over
/// [`Query::iter`] may freely mutate components through the world.
#[derive(Clone)]
pub struct Query(Rc<QueryShared>);

impl Query {
    pub(crate) fn new(
        id: QueryId,
        desc: QueryDesc,
        query_capacity: usize,
        entity_capacity: usize,
    ) -> Self {
        Self(Rc::new(QueryShared {
            id,
            desc,
            membership: RefCell::new(Membership::new(query_capacity, entity_capacity)),
            added: RefCell::new(Listeners::new()),
            removed: RefCell::new(Listeners::new()),
        }))
    }

    /// This query's id.
    #[must_use]
    pub fn id(&self) -> QueryId {
        self.0.id
    }

    /// The canonical filter this query maintains.
    #[must_use]
    pub fn desc(&self) -> &QueryDesc {
        &self.0.desc
    }

    /// Shorthand for `self.desc().signature()`.
    #[must_use]
    pub fn signature(&self) -> u64 {
        self.0.desc.signature()
    }

    /// Number of member entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.membership.borrow().dense.len()
    }

    /// Returns `true` if no entity matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `entity` is currently a member. Changes deferred by
    /// an active iteration are not visible until the lock is released.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.0.membership.borrow().contains(entity)
    }

    /// Copies the current members. Order is unspecified.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.0.membership.borrow().dense.clone()
    }

    /// Returns `true` while at least one iteration or manual lock is active.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock_count() > 0
    }

    /// Number of outstanding locks.
    #[must_use]
    pub fn lock_count(&self) -> u32 {
        self.0.membership.borrow().lock_count
    }

    /// Iterates over a snapshot of the members, locking the query until the
    /// iterator is dropped.
    #[must_use]
    pub fn iter(&self) -> QueryIter {
        self.lock();
        let len = self.len();
        QueryIter {
            query: self.clone(),
            index: 0,
            len,
        }
    }

    /// Acquires a lock manually. Must be paired with [`Query::unlock`].
    pub fn lock(&self) {
        self.0.membership.borrow_mut().lock_count += 1;
    }

    /// Releases a lock. When the last lock is released every deferred
    /// membership change is applied in the order it was submitted.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::LockImbalance`] if the query is not locked.
    pub fn unlock(&self) -> Result<()> {
        let ops = {
            let mut membership = self.0.membership.borrow_mut();
            if membership.lock_count == 0 {
                return Err(EcsError::LockImbalance { query: self.0.id });
            }
            membership.lock_count -= 1;
            if membership.lock_count > 0 || membership.deferred.is_empty() {
                return Ok(());
            }
            membership.pending.clear();
            std::mem::take(&mut membership.deferred)
        };

        for &op in &ops {
            match op {
                DeferredOp::Add(entity) => self.apply_insert(entity),
                DeferredOp::Remove(entity) => self.apply_remove(entity),
            }
        }

        // Hand the buffer back so the next locked frame does not allocate.
        let mut membership = self.0.membership.borrow_mut();
        if membership.deferred.is_empty() {
            let mut ops = ops;
            ops.clear();
            membership.deferred = ops;
        }
        Ok(())
    }

    /// Subscribes to entities entering the query.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of this query's own callbacks.
    pub fn on_entity_added(&self, callback: impl FnMut(&Entity) + 'static) -> ListenerId {
        self.0.added.borrow_mut().subscribe(callback)
    }

    /// Subscribes to entities leaving the query.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of this query's own callbacks.
    pub fn on_entity_removed(&self, callback: impl FnMut(&Entity) + 'static) -> ListenerId {
        self.0.removed.borrow_mut().subscribe(callback)
    }

    /// Removes a callback registered with [`Query::on_entity_added`].
    pub fn unsubscribe_added(&self, id: ListenerId) -> bool {
        self.0.added.borrow_mut().unsubscribe(id)
    }

    /// Removes a callback registered with [`Query::on_entity_removed`].
    pub fn unsubscribe_removed(&self, id: ListenerId) -> bool {
        self.0.removed.borrow_mut().unsubscribe(id)
    }

    /// Membership including changes still waiting in the deferred buffer.
    pub(crate) fn contains_logical(&self, entity: Entity) -> bool {
        self.0.membership.borrow().contains_logical(entity)
    }

    /// Adds `entity`, or queues the addition while locked.
    pub(crate) fn insert(&self, entity: Entity) {
        {
            let mut membership = self.0.membership.borrow_mut();
            if membership.lock_count > 0 {
                membership.defer(DeferredOp::Add(entity));
                return;
            }
        }
        self.apply_insert(entity);
    }

    /// Removes `entity`, or queues the removal while locked.
    pub(crate) fn remove(&self, entity: Entity) {
        {
            let mut membership = self.0.membership.borrow_mut();
            if membership.lock_count > 0 {
                membership.defer(DeferredOp::Remove(entity));
                return;
            }
        }
        self.apply_remove(entity);
    }

    pub(crate) fn resize(&self, entity_capacity: usize) {
        let mut membership = self.0.membership.borrow_mut();
        if entity_capacity > membership.sparse.len() {
            membership.sparse.resize(entity_capacity, 0);
        }
    }

    fn apply_insert(&self, entity: Entity) {
        self.0.membership.borrow_mut().push(entity);
        self.0.added.borrow_mut().emit(&entity);
    }

    fn apply_remove(&self, entity: Entity) {
        self.0.membership.borrow_mut().swap_remove(entity);
        self.0.removed.borrow_mut().emit(&entity);
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let membership = self.0.membership.borrow();
        f.debug_struct("Query")
            .field("id", &self.0.id)
            .field("desc", &self.0.desc)
            .field("len", &membership.dense.len())
            .field("lock_count", &membership.lock_count)
            .field("deferred", &membership.deferred.len())
            .finish()
    }
}

impl IntoIterator for &Query {
    type Item = Entity;
    type IntoIter = QueryIter;

    fn into_iter(self) -> QueryIter {
        self.iter()
    }
}

/// Iterator over a locked snapshot of a query's members.
///
/// Dropping the iterator releases the lock, on every exit path, and replays
/// any membership changes made while it was alive.
pub struct QueryIter {
    query: Query,
    index: usize,
    len: usize,
}

impl Iterator for QueryIter {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        if self.index >= self.len {
            return None;
        }
        let entity = self.query.0.membership.borrow().dense.get(self.index).copied();
        self.index += 1;
        entity
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for QueryIter {}

impl Drop for QueryIter {
    /// # Panics
    ///
    /// Panics with [`EcsError::LockImbalance`] if the lock this iterator
    /// took was already released by a manual [`Query::unlock`].
    fn drop(&mut self) {
        if let Err(err) = self.query.unlock() {
            error!(query = %self.query.id(), %err, "query iterator released an unheld lock");
            if !std::thread::panicking() {
                panic!("{err}");
            }
        }
    }
}

impl fmt::Debug for QueryIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryIter")
            .field("query", &self.query.id())
            .field("index", &self.index)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    const A: ComponentId = ComponentId(0);
    const B: ComponentId = ComponentId(1);
    const C: ComponentId = ComponentId(2);

    fn query() -> Query {
        Query::new(QueryId(0), QueryDesc::new().with_all([A]).build(), 4, 16)
    }

    #[test]
    fn test_build_sorts_and_dedups() {
        let desc = QueryDesc::new().with_all([C, A, C]).with_none([B]).build();
        assert_eq!(desc.all(), &[A, C]);
        assert_eq!(desc.none(), &[B]);
        assert!(desc.is_built());
    }

    #[test]
    fn test_signature_ignores_insertion_order() {
        let d1 = QueryDesc::new().with_all([A, B]).with_none([C]).build();
        let d2 = QueryDesc::new().with_none([C]).with_all([B]).with_all([A]).build();
        assert_eq!(d1.signature(), d2.signature());
        assert!(d1.same_terms(&d2));
    }

    #[test]
    fn test_signature_distinguishes_roles() {
        let all = QueryDesc::new().with_all([A]).build();
        let any = QueryDesc::new().with_any([A]).build();
        let none = QueryDesc::new().with_none([A]).build();
        assert_ne!(all.signature(), any.signature());
        assert_ne!(all.signature(), none.signature());
        assert_ne!(any.signature(), none.signature());
    }

    #[test]
    fn test_modifying_invalidates_build() {
        let desc = QueryDesc::new().with_all([A]).build().with_any([B]);
        assert!(!desc.is_built());
    }

    #[test]
    fn test_reset_clears_terms() {
        let mut desc = QueryDesc::new().with_all([A]).with_any([B]).build();
        desc.reset();
        assert!(desc.all().is_empty() && desc.any().is_empty() && desc.none().is_empty());
        assert!(!desc.is_built());
    }

    #[test]
    fn test_matches_terms() {
        let desc = QueryDesc::new()
            .with_all([A])
            .with_any([B, C])
            .with_none([ComponentId(3)])
            .build();
        assert!(desc.matches(|id| id == A || id == B));
        assert!(desc.matches(|id| id == A || id == C));
        assert!(!desc.matches(|id| id == A));
        assert!(!desc.matches(|id| id == B));
        assert!(!desc.matches(|_| true));
    }

    #[test]
    fn test_empty_desc_matches_everything() {
        let desc = QueryDesc::new().build();
        assert!(desc.matches_empty());
        assert!(desc.matches(|_| false));
        assert!(!QueryDesc::new().with_any([A]).build().matches_empty());
    }

    #[test]
    fn test_insert_and_swap_remove() {
        let q = query();
        q.insert(Entity(1));
        q.insert(Entity(5));
        q.insert(Entity(9));
        q.remove(Entity(1));
        assert_eq!(q.len(), 2);
        assert!(!q.contains(Entity(1)));
        assert!(q.contains(Entity(5)) && q.contains(Entity(9)));
        // The last member moved into the freed position.
        assert_eq!(q.entities(), vec![Entity(9), Entity(5)]);
        q.remove(Entity(5));
        assert_eq!(q.entities(), vec![Entity(9)]);
    }

    #[test]
    fn test_dense_grows_past_initial_capacity() {
        let q = query();
        for i in 0..16 {
            q.insert(Entity(i));
        }
        assert_eq!(q.len(), 16);
    }

    #[test]
    fn test_iteration_defers_changes() {
        let q = query();
        q.insert(Entity(1));
        q.insert(Entity(2));

        let mut seen = Vec::new();
        for entity in &q {
            seen.push(entity);
            q.remove(entity);
            q.insert(Entity(entity.0 + 10));
            assert!(q.contains(entity));
        }

        assert_eq!(seen, vec![Entity(1), Entity(2)]);
        assert!(!q.is_locked());
        let mut members = q.entities();
        members.sort();
        assert_eq!(members, vec![Entity(11), Entity(12)]);
    }

    #[test]
    fn test_replay_preserves_submission_order() {
        let q = query();
        let log = Rc::new(RefCell::new(Vec::new()));
        let added = Rc::clone(&log);
        q.on_entity_added(move |e| added.borrow_mut().push(("add", *e)));
        let removed = Rc::clone(&log);
        q.on_entity_removed(move |e| removed.borrow_mut().push(("remove", *e)));

        q.lock();
        q.insert(Entity(3));
        q.insert(Entity(4));
        q.remove(Entity(3));
        assert!(log.borrow().is_empty());
        q.unlock().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![("add", Entity(3)), ("add", Entity(4)), ("remove", Entity(3))]
        );
        assert_eq!(q.entities(), vec![Entity(4)]);
    }

    #[test]
    fn test_logical_membership_tracks_pending_ops() {
        let q = query();
        q.insert(Entity(1));
        q.lock();
        q.remove(Entity(1));
        q.insert(Entity(2));
        assert!(q.contains(Entity(1)));
        assert!(!q.contains_logical(Entity(1)));
        assert!(q.contains_logical(Entity(2)));
        q.unlock().unwrap();
        assert!(!q.contains_logical(Entity(1)));
        assert!(q.contains_logical(Entity(2)));
    }

    #[test]
    fn test_nested_locks_replay_on_last_release() {
        let q = query();
        let outer = q.iter();
        let inner = q.iter();
        q.insert(Entity(7));
        drop(inner);
        assert!(q.is_locked());
        assert!(!q.contains(Entity(7)));
        drop(outer);
        assert!(q.contains(Entity(7)));
    }

    #[test]
    fn test_early_break_releases_lock() {
        let q = query();
        q.insert(Entity(1));
        q.insert(Entity(2));
        for entity in &q {
            q.remove(entity);
            if entity == Entity(1) {
                break;
            }
        }
        assert!(!q.is_locked());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_unlock_without_lock_is_imbalance() {
        let q = query();
        assert_eq!(
            q.unlock(),
            Err(EcsError::LockImbalance { query: QueryId(0) })
        );
        q.lock();
        assert!(q.unlock().is_ok());
        assert!(q.unlock().is_err());
    }

    #[test]
    #[should_panic(expected = "Query(0) was unlocked without a matching lock")]
    fn test_iterator_drop_after_manual_unlock_panics() {
        let q = query();
        q.insert(Entity(1));
        for _ in &q {
            q.unlock().unwrap();
        }
    }

    #[test]
    fn test_iterator_is_exact_size() {
        let q = query();
        q.insert(Entity(1));
        q.insert(Entity(2));
        let mut iter = q.iter();
        assert_eq!(iter.len(), 2);
        iter.next();
        assert_eq!(iter.len(), 1);
    }

    #[test]
    fn test_resize_extends_reverse_index() {
        let q = query();
        q.resize(64);
        q.insert(Entity(63));
        assert!(q.contains(Entity(63)));
    }
}
