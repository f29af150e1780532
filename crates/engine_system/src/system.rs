//! The [`System`] trait.

use std::any::Any;

use anyhow::Result;
use engine_ecs::World;

use crate::context::SystemContext;

/// Upcasts to [`Any`] so a boxed [`System`] can be handed back as its
/// concrete type. Implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of logic run once per tick.
///
/// Systems hold no world reference. Each hook borrows the world for its
/// duration, and queries a system needs are typically built in
/// [`init`](System::init) and kept as [`engine_ecs::Query`] handles.
pub trait System: AsAny {
    /// Display name used in logs and error context.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Called once before the first update, or right away when the system is
    /// added to an already initialized runner.
    ///
    /// # Errors
    ///
    /// Returns any error raised while preparing queries or seeding state.
    fn init(&mut self, _world: &mut World) -> Result<()> {
        Ok(())
    }

    /// Called once per tick, in registration order.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the system's logic.
    fn update(&mut self, world: &mut World, ctx: &SystemContext) -> Result<()>;

    /// Called when the system is removed or the runner shuts down.
    fn dispose(&mut self, _world: &mut World) {}
}
