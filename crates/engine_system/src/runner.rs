//! System runner: an ordered, de-duplicated list of systems.

use std::any::TypeId;

use anyhow::{Context, Result};
use engine_ecs::World;
use tracing::debug;

use crate::context::SystemContext;
use crate::system::{AsAny, System};

struct Entry {
    type_id: TypeId,
    system: Box<dyn System>,
}

/// Runs registered systems against a world in registration order.
///
/// At most one system of each type is registered. Systems added after
/// [`SystemRunner::init`] are initialized immediately.
#[derive(Default)]
pub struct SystemRunner {
    systems: Vec<Entry>,
    initialized: bool,
}

impl SystemRunner {
    /// Create an empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `system`.
    ///
    /// Returns `Ok(false)` without touching anything if a system of the same
    /// type is already registered.
    ///
    /// # Errors
    ///
    /// Returns the system's `init` error when the runner is already
    /// initialized; the system is not registered in that case.
    pub fn add<S: System>(&mut self, world: &mut World, mut system: S) -> Result<bool> {
        let type_id = TypeId::of::<S>();
        if self.systems.iter().any(|entry| entry.type_id == type_id) {
            debug!(system = system.name(), "system already registered");
            return Ok(false);
        }

        if self.initialized {
            system
                .init(world)
                .with_context(|| format!("failed to initialize system `{}`", system.name()))?;
        }
        debug!(system = system.name(), "registered system");
        self.systems.push(Entry {
            type_id,
            system: Box::new(system),
        });
        Ok(true)
    }

    /// Unregisters the system of type `S`, calling its `dispose` hook.
    /// Returns `false` if none was registered.
    pub fn remove<S: System>(&mut self, world: &mut World) -> bool {
        let type_id = TypeId::of::<S>();
        let Some(pos) = self.systems.iter().position(|entry| entry.type_id == type_id) else {
            return false;
        };
        let mut entry = self.systems.remove(pos);
        entry.system.dispose(world);
        debug!(system = entry.system.name(), "removed system");
        true
    }

    /// Returns `true` if a system of type `S` is registered.
    #[must_use]
    pub fn contains<S: System>(&self) -> bool {
        let type_id = TypeId::of::<S>();
        self.systems.iter().any(|entry| entry.type_id == type_id)
    }

    /// The registered system of type `S`.
    #[must_use]
    pub fn get<S: System>(&self) -> Option<&S> {
        let type_id = TypeId::of::<S>();
        let entry = self.systems.iter().find(|entry| entry.type_id == type_id)?;
        let system: &dyn System = &*entry.system;
        system.as_any().downcast_ref()
    }

    /// Mutable access to the registered system of type `S`.
    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        let type_id = TypeId::of::<S>();
        let entry = self.systems.iter_mut().find(|entry| entry.type_id == type_id)?;
        let system: &mut dyn System = &mut *entry.system;
        system.as_any_mut().downcast_mut()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.systems.iter().map(|entry| entry.system.name())
    }

    /// Returns `true` once [`SystemRunner::init`] has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initializes every registered system in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first `init` error.
    pub fn init(&mut self, world: &mut World) -> Result<()> {
        for entry in &mut self.systems {
            let name = entry.system.name();
            entry
                .system
                .init(world)
                .with_context(|| format!("failed to initialize system `{name}`"))?;
        }
        self.initialized = true;
        debug!(systems = self.systems.len(), "systems initialized");
        Ok(())
    }

    /// Runs one tick of every system in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first `update` error.
    pub fn update(&mut self, world: &mut World, ctx: &SystemContext) -> Result<()> {
        for entry in &mut self.systems {
            let name = entry.system.name();
            entry
                .system
                .update(world, ctx)
                .with_context(|| format!("system `{name}` failed on tick {}", ctx.tick_id))?;
        }
        Ok(())
    }

    /// Disposes every system in reverse registration order and empties the
    /// runner.
    pub fn shutdown(&mut self, world: &mut World) {
        while let Some(mut entry) = self.systems.pop() {
            entry.system.dispose(world);
        }
        self.initialized = false;
        debug!("systems shut down");
    }
}

impl std::fmt::Debug for SystemRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRunner")
            .field("systems", &self.names().collect::<Vec<_>>())
            .field("initialized", &self.initialized)
            .finish()
    }
}
