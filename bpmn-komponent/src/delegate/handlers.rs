//! Task handlers bound to task definition keys.

use super::DelegateExecution;
use crate::errors::{HandlerError, InvalidStateError};
use crate::interceptors::StepContext;
use crate::scope::ScopeManager;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Binds a task handler to a task, optionally within one process only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandlerKey {
    /// The task definition key.
    pub task_key: String,
    /// The process definition key, or `None` for any process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_key: Option<String>,
}

impl TaskHandlerKey {
    /// Creates a key matching the task in any process.
    #[must_use]
    pub fn new(task_key: impl Into<String>) -> Self {
        Self {
            task_key: task_key.into(),
            process_key: None,
        }
    }

    /// Restricts the key to one process.
    #[must_use]
    pub fn for_process(mut self, process_key: impl Into<String>) -> Self {
        self.process_key = Some(process_key.into());
        self
    }
}

impl fmt::Display for TaskHandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.process_key {
            Some(ref process) => write!(f, "{process}:{}", self.task_key),
            None => write!(f, "*:{}", self.task_key),
        }
    }
}

/// User code run when the engine reaches a bound task.
pub trait TaskHandler: Send + Sync {
    /// Executes the task for the given execution.
    fn execute_task(&self, execution: &DelegateExecution) -> anyhow::Result<()>;
}

/// Builds a task handler for the request owning the given scope.
///
/// Handlers that need execution-scoped capabilities keep the scope and
/// resolve from it when they run.
pub type TaskHandlerConstructor =
    Arc<dyn Fn(&Arc<ScopeManager>) -> Arc<dyn TaskHandler> + Send + Sync>;

/// Registry of task handlers.
#[derive(Default)]
pub struct TaskHandlerRegistry {
    handlers: RwLock<HashMap<TaskHandlerKey, TaskHandlerConstructor>>,
}

impl TaskHandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a handler constructor to a key, replacing any previous binding.
    pub fn register(&self, key: TaskHandlerKey, constructor: TaskHandlerConstructor) {
        debug!(key = %key, "Registering task handler");
        self.handlers.write().insert(key, constructor);
    }

    /// Finds the constructor for a task.
    ///
    /// A binding for the exact process wins over a process-agnostic one.
    #[must_use]
    pub fn find(
        &self,
        task_key: &str,
        process_key: Option<&str>,
    ) -> Option<TaskHandlerConstructor> {
        let handlers = self.handlers.read();

        process_key
            .and_then(|process| handlers.get(&TaskHandlerKey::new(task_key).for_process(process)))
            .or_else(|| handlers.get(&TaskHandlerKey::new(task_key)))
            .cloned()
    }

    /// Checks if a handler is bound for the task.
    #[must_use]
    pub fn handles(&self, task_key: &str, process_key: Option<&str>) -> bool {
        self.find(task_key, process_key).is_some()
    }

    /// Runs the handler bound to the task against the active execution.
    ///
    /// The handler receives a fresh [`DelegateExecution`] over the execution
    /// active in `step`'s scope.
    pub fn dispatch(
        &self,
        step: &StepContext,
        process_key: Option<&str>,
        task_key: &str,
    ) -> anyhow::Result<()> {
        let constructor = self
            .find(task_key, process_key)
            .ok_or_else(|| HandlerError::task_handler_not_found(task_key, process_key))?;

        let execution = step
            .scope()
            .context_execution()
            .ok_or_else(|| InvalidStateError::new(std::any::type_name::<DelegateExecution>()))?;

        debug!(
            task_key,
            process_key = ?process_key,
            execution_id = %execution.id(),
            "Dispatching task handler"
        );

        let handler = constructor(step.scope());
        handler.execute_task(&DelegateExecution::new(execution))
    }

    /// Returns the number of bound handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns true if no handlers are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl fmt::Debug for TaskHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}
