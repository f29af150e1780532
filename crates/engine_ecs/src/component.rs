//! Core [`Component`] trait and component-kind identifiers.
//!
//! Every piece of per-entity data stored in the world implements
//! [`Component`]. The world assigns each distinct component type a small,
//! dense [`ComponentId`] the first time the type is seen; routing tables and
//! stores are plain arrays indexed by that id.

use std::fmt;

/// A dense identifier for a component kind, assigned in registration order.
///
/// Ids are only meaningful within the [`World`](crate::World) that assigned
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Returns the identifier as an array index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// The core component trait.
///
/// Components are plain values. A freshly added component starts out as
/// `Default::default()`, and removing a component resets its slot back to the
/// default so nothing stale is kept alive.
///
/// # Examples
///
/// ```rust
/// use engine_ecs::Component;
///
/// #[derive(Debug, Default, Clone, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Default + fmt::Debug + 'static {
    /// A human-readable name for this component type.
    ///
    /// Defaults to the last path segment of [`std::any::type_name`].
    fn type_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
