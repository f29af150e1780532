//! Error types for world operations.
//!
//! Every variant is a misuse of the API by the caller. Nothing here is
//! retryable; callers are expected to propagate with `?` and fix the call
//! site.

use crate::entity::Entity;
use crate::query::QueryId;

/// Errors returned by entity, component and query operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity was destroyed or never allocated.
    #[error("{0} is not alive")]
    InvalidEntity(Entity),

    /// `add` was called for a component the entity already has.
    #[error("component `{component}` is already attached to {entity}")]
    DuplicateComponent {
        /// The entity the component was added to.
        entity: Entity,
        /// Name of the component kind.
        component: &'static str,
    },

    /// `get`/`set` was called for a component the entity does not have.
    #[error("component `{component}` is not attached to {entity}")]
    MissingComponent {
        /// The entity that was accessed.
        entity: Entity,
        /// Name of the component kind.
        component: &'static str,
    },

    /// A query was unlocked more times than it was locked.
    #[error("{query} was unlocked without a matching lock")]
    LockImbalance {
        /// The query whose lock count would have gone negative.
        query: QueryId,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = EcsError> = std::result::Result<T, E>;
