//! Delegate tasks and the registry-backed task factory.

use super::DelegateExecution;
use crate::errors::{HandlerError, KomponentError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Service-task code invoked by the engine.
pub trait DelegateTask: Send + Sync {
    /// Executes the task for the given execution.
    fn execute(&self, execution: &DelegateExecution) -> anyhow::Result<()>;
}

/// Resolves delegate tasks by the type name referenced in a process model.
#[cfg_attr(test, mockall::automock)]
pub trait DelegateTaskFactory: Send + Sync {
    /// Creates the delegate task registered under `type_name`.
    fn create_delegate_task(
        &self,
        type_name: &str,
    ) -> Result<Arc<dyn DelegateTask>, KomponentError>;
}

/// Constructor function for delegate tasks.
pub type DelegateTaskConstructor = Arc<dyn Fn() -> Arc<dyn DelegateTask> + Send + Sync>;

/// Delegate task factory that pulls tasks from a registry by type name.
#[derive(Default)]
pub struct RegistryDelegateTaskFactory {
    tasks: RwLock<HashMap<String, DelegateTaskConstructor>>,
}

impl RegistryDelegateTaskFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its fully qualified type name.
    ///
    /// Returns the name the task was registered under.
    pub fn register<T>(&self) -> &'static str
    where
        T: DelegateTask + Default + 'static,
    {
        let type_name = std::any::type_name::<T>();
        self.register_with(
            type_name,
            Arc::new(|| -> Arc<dyn DelegateTask> { Arc::new(T::default()) }),
        );
        type_name
    }

    /// Registers a constructor under an explicit type name.
    pub fn register_with(
        &self,
        type_name: impl Into<String>,
        constructor: DelegateTaskConstructor,
    ) {
        let type_name = type_name.into();
        debug!(type_name = %type_name, "Registering delegate task");

        if self.tasks.write().insert(type_name.clone(), constructor).is_some() {
            warn!(type_name = %type_name, "Replaced existing delegate task registration");
        }
    }

    /// Checks if a task is registered under the type name.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.tasks.read().contains_key(type_name)
    }

    /// Lists registered type names.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        self.tasks.read().keys().cloned().collect()
    }
}

impl DelegateTaskFactory for RegistryDelegateTaskFactory {
    fn create_delegate_task(
        &self,
        type_name: &str,
    ) -> Result<Arc<dyn DelegateTask>, KomponentError> {
        let constructor = self
            .tasks
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| HandlerError::delegate_task_not_found(type_name))?;

        Ok(constructor())
    }
}

impl std::fmt::Debug for RegistryDelegateTaskFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryDelegateTaskFactory")
            .field("type_names", &self.type_names())
            .finish()
    }
}
