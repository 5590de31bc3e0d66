//! Business-process scope manager.

use super::bindings::{Capability, ScopeBindings, ScopedInstance};
use crate::errors::{CapabilityNotBoundError, InvalidStateError, ScopeError};
use crate::execution::{ExecutionHandle, HandleToken};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

type InstanceTable = HashMap<HandleToken, HashMap<Capability, ScopedInstance>>;

/// Manages contextual instances tied to the execution currently in scope.
///
/// One manager exists per unit of concurrency (request, task or worker) and
/// is passed explicitly to every execution step. It owns:
///
/// - the active binding, which reflects the innermost execution step still
///   on the call stack, and
/// - the scoped instance table, holding at most one instance per
///   (execution handle, capability).
///
/// Factories come from the shared [`ScopeBindings`].
pub struct ScopeManager {
    bindings: Arc<ScopeBindings>,
    active: RwLock<Option<ExecutionHandle>>,
    instances: RwLock<InstanceTable>,
}

impl ScopeManager {
    /// Creates a manager with no active execution.
    #[must_use]
    pub fn new(bindings: Arc<ScopeBindings>) -> Self {
        Self {
            bindings,
            active: RwLock::new(None),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the factory bindings used by this manager.
    #[must_use]
    pub fn bindings(&self) -> &Arc<ScopeBindings> {
        &self.bindings
    }

    /// Associates the scope with the given execution (or none).
    ///
    /// Returns the previously active execution so callers can restore it.
    pub fn enter_context(&self, execution: Option<ExecutionHandle>) -> Option<ExecutionHandle> {
        let previous = std::mem::replace(&mut *self.active.write(), execution);
        trace!(
            previous = ?previous.as_ref().map(ExecutionHandle::id),
            "Entered business-process context"
        );
        previous
    }

    /// Clears the active execution without destroying any scoped instances.
    pub fn leave_context(&self) -> Option<ExecutionHandle> {
        self.enter_context(None)
    }

    /// Returns the active execution, if any.
    #[must_use]
    pub fn context_execution(&self) -> Option<ExecutionHandle> {
        self.active.read().clone()
    }

    /// Returns true if an execution is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    /// Destroys all instances scoped to the given execution handle.
    ///
    /// The active binding is untouched. Returns the number of instances
    /// dropped; zero when nothing was cached for the handle.
    pub fn destroy_context(&self, execution: &ExecutionHandle) -> usize {
        let removed = self.instances.write().remove(&execution.token());

        let count = removed.as_ref().map_or(0, HashMap::len);
        if count > 0 {
            debug!(
                execution_id = %execution.id(),
                instances = count,
                "Destroyed business-process scoped instances"
            );
        }

        // Instances drop here, outside the table lock.
        drop(removed);
        count
    }

    /// Drops the active binding and every scoped instance of every execution.
    pub fn clear(&self) {
        *self.active.write() = None;
        let table = std::mem::take(&mut *self.instances.write());

        if !table.is_empty() {
            trace!(executions = table.len(), "Cleared business-process scope");
        }
    }

    /// Resolves the instance of `T` scoped to the active execution.
    ///
    /// The first resolution per execution handle invokes the bound factory
    /// with that handle; later resolutions return the cached instance.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::InvalidState`] when no execution is active and
    /// [`ScopeError::CapabilityNotBound`] when no factory is bound for `T`.
    /// Neither case touches the instance table.
    pub fn resolve_scoped<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ScopeError> {
        let capability = Capability::of::<T>();
        let execution = self
            .context_execution()
            .ok_or_else(|| InvalidStateError::new(capability.name()))?;

        let cached = self
            .instances
            .read()
            .get(&execution.token())
            .and_then(|scoped| scoped.get(&capability))
            .cloned();
        if let Some(instance) = cached {
            return downcast(capability, instance);
        }

        let factory = self
            .bindings
            .factory(&capability)
            .ok_or_else(|| CapabilityNotBoundError::new(capability.name()))?;

        // The factory may resolve other capabilities, so no lock is held here.
        let created = factory(&execution);
        trace!(
            capability = %capability,
            execution_id = %execution.id(),
            "Created business-process scoped instance"
        );

        let mut table = self.instances.write();
        let scoped = table.entry(execution.token()).or_default();
        let (instance, discarded) = match scoped.entry(capability) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), Some(created)),
            Entry::Vacant(slot) => (Arc::clone(slot.insert(created)), None),
        };
        drop(table);

        // Another resolution filled the slot first; the loser drops unlocked.
        drop(discarded);
        downcast(capability, instance)
    }

    /// Returns the number of instances cached for an execution handle.
    #[must_use]
    pub fn cached_count(&self, execution: &ExecutionHandle) -> usize {
        self.instances
            .read()
            .get(&execution.token())
            .map_or(0, HashMap::len)
    }

    /// Returns the handles that currently own scoped instances.
    #[must_use]
    pub fn scoped_executions(&self) -> Vec<HandleToken> {
        self.instances.read().keys().copied().collect()
    }
}

fn downcast<T: Any + Send + Sync>(
    capability: Capability,
    instance: ScopedInstance,
) -> Result<Arc<T>, ScopeError> {
    instance.downcast::<T>().map_err(|_| ScopeError::TypeMismatch {
        capability: capability.name().to_string(),
    })
}

impl fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeManager")
            .field("active", &self.active.read().as_ref().map(ExecutionHandle::id))
            .field("scoped_executions", &self.instances.read().len())
            .finish()
    }
}
