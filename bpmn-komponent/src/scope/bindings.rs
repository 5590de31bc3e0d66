//! Application-wide registry of execution-scoped factories.

use crate::execution::ExecutionHandle;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An instance cached for one execution.
pub type ScopedInstance = Arc<dyn Any + Send + Sync>;

/// Factory producing a scoped instance for the active execution.
pub type ScopedFactory = Arc<dyn Fn(&ExecutionHandle) -> ScopedInstance + Send + Sync>;

/// Identifies an abstract dependency that scoped instances are resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    type_id: TypeId,
    name: &'static str,
}

impl Capability {
    /// Returns the capability for the type `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the type name of the capability.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Registered factories for business-process scoped capabilities.
///
/// Bindings are shared by every [`ScopeManager`](super::ScopeManager); the
/// instances they produce are not.
#[derive(Default)]
pub struct ScopeBindings {
    factories: DashMap<Capability, ScopedFactory>,
}

impl ScopeBindings {
    /// Creates an empty set of bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a lazily invoked factory to the capability `T`.
    ///
    /// The factory receives the execution that is active when the instance is
    /// first resolved. It runs at most once per execution handle. Binding the
    /// same capability again replaces the previous factory.
    pub fn bind_factory_proxy<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ExecutionHandle) -> T + Send + Sync + 'static,
    {
        let capability = Capability::of::<T>();
        debug!(capability = %capability, "Binding business-process scoped factory");

        let factory: ScopedFactory = Arc::new(move |execution: &ExecutionHandle| -> ScopedInstance {
            Arc::new(factory(execution))
        });
        self.factories.insert(capability, factory);
    }

    /// Removes the factory bound to `T`. Returns true if one was bound.
    pub fn unbind<T: Any>(&self) -> bool {
        self.factories.remove(&Capability::of::<T>()).is_some()
    }

    /// Checks if a factory is bound to `T`.
    #[must_use]
    pub fn is_bound<T: Any>(&self) -> bool {
        self.factories.contains_key(&Capability::of::<T>())
    }

    /// Returns the factory bound to a capability.
    #[must_use]
    pub fn factory(&self, capability: &Capability) -> Option<ScopedFactory> {
        self.factories.get(capability).map(|entry| Arc::clone(entry.value()))
    }

    /// Lists all bound capabilities.
    #[must_use]
    pub fn capabilities(&self) -> Vec<Capability> {
        self.factories.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns the number of bound capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ScopeBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeBindings")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
