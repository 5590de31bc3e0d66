//! The execution view handed to delegate tasks and task handlers.

use crate::execution::ExecutionHandle;
use std::collections::HashMap;
use uuid::Uuid;

/// A view over an execution exposed to user code.
///
/// This is the default business-process scoped capability: resolving it
/// through a [`ScopeManager`](crate::scope::ScopeManager) yields the view of
/// whichever execution is active at that time. Two views over the same
/// execution compare equal even when they are distinct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateExecution {
    execution: ExecutionHandle,
}

impl DelegateExecution {
    /// Creates a view over the given execution.
    #[must_use]
    pub fn new(execution: ExecutionHandle) -> Self {
        Self { execution }
    }

    /// Returns the underlying execution handle.
    #[must_use]
    pub fn execution(&self) -> &ExecutionHandle {
        &self.execution
    }

    /// Returns the execution ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.execution.id()
    }

    /// Returns the process instance ID.
    #[must_use]
    pub fn process_instance_id(&self) -> Uuid {
        self.execution.process_instance_id()
    }

    /// Returns the current activity ID.
    #[must_use]
    pub fn activity_id(&self) -> Option<&str> {
        self.execution.activity_id()
    }

    /// Returns the business key of the process instance.
    #[must_use]
    pub fn business_key(&self) -> Option<&str> {
        self.execution.business_key()
    }

    /// Gets a variable value.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<serde_json::Value> {
        self.execution.variable(name)
    }

    /// Sets a variable.
    pub fn set_variable(&self, name: impl Into<String>, value: serde_json::Value) {
        self.execution.set_variable(name, value);
    }

    /// Returns a copy of all variables.
    #[must_use]
    pub fn variables(&self) -> HashMap<String, serde_json::Value> {
        self.execution.variables()
    }
}
