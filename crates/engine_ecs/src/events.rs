//! Structural-change notifications.
//!
//! Each notification kind is a plain ordered list of callbacks. Emitting
//! walks the list in subscription order and never allocates. Callbacks only
//! observe: they receive the event payload, not the world, so they cannot
//! mutate structure while the world is mid-operation.

use std::fmt;

use crate::component::ComponentId;
use crate::entity::Entity;
use crate::query::Query;

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<A> = Box<dyn FnMut(&A)>;

/// An ordered list of callbacks for one notification kind.
pub struct Listeners<A> {
    next_id: u64,
    entries: Vec<(ListenerId, Callback<A>)>,
}

impl<A> Listeners<A> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Appends `callback`; it runs after every callback subscribed before it.
    pub fn subscribe(&mut self, callback: impl FnMut(&A) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns `false` if `id` was not subscribed here.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of subscribed callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn emit(&mut self, payload: &A) {
        for (_, callback) in &mut self.entries {
            callback(payload);
        }
    }
}

impl<A> Default for Listeners<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Listeners<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// World-level notification lists.
#[derive(Debug, Default)]
pub struct WorldEvents {
    /// The entity capacity grew; payload is the new capacity.
    pub resized: Listeners<usize>,
    /// An entity was created (fresh or recycled).
    pub entity_created: Listeners<Entity>,
    /// An entity was finalized and its index recycled.
    pub entity_destroyed: Listeners<Entity>,
    /// A component was attached.
    pub component_added: Listeners<(Entity, ComponentId)>,
    /// A component was detached.
    pub component_removed: Listeners<(Entity, ComponentId)>,
    /// A new query was built (not emitted on cache hits).
    pub query_created: Listeners<Query>,
}
