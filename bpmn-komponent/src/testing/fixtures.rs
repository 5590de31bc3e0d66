//! Test fixtures for scope and engine tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::delegate::DelegateExecution;
use crate::engine::ExecutionSession;
use crate::execution::{ExecutionHandle, ExecutionInfo};
use crate::interceptors::{InterceptorChain, ScopeExecutionInterceptor, TracingInterceptor};
use crate::scope::{ScopeBindings, ScopeManager};

/// Builder for execution handles used in tests.
#[derive(Debug, Default)]
pub struct TestExecution {
    /// Activity the execution is positioned at.
    pub activity_id: Option<String>,
    /// Business key of the process instance.
    pub business_key: Option<String>,
    /// Initial variables.
    pub variables: HashMap<String, serde_json::Value>,
}

impl TestExecution {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the activity.
    #[must_use]
    pub fn at(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    /// Sets the business key.
    #[must_use]
    pub fn with_business_key(mut self, key: impl Into<String>) -> Self {
        self.business_key = Some(key.into());
        self
    }

    /// Adds a variable.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Builds a process-instance execution handle.
    #[must_use]
    pub fn build(self) -> ExecutionHandle {
        let mut info = ExecutionInfo::root();
        if let Some(activity_id) = self.activity_id {
            info = info.with_activity_id(activity_id);
        }
        if let Some(business_key) = self.business_key {
            info = info.with_business_key(business_key);
        }
        ExecutionHandle::with_variables(info, self.variables)
    }
}

/// A scope manager with `DelegateExecution` bound, plus a session running
/// steps through the scope and tracing interceptors.
pub struct ScopeHarness {
    /// Shared bindings.
    pub bindings: Arc<ScopeBindings>,
    /// The request's scope manager.
    pub scope: Arc<ScopeManager>,
    /// Session driving execution steps.
    pub session: ExecutionSession,
}

impl ScopeHarness {
    /// Creates a harness.
    #[must_use]
    pub fn new() -> Self {
        Self::with_chain(InterceptorChain::new())
    }

    /// Creates a harness whose chain also contains `chain`'s interceptors.
    #[must_use]
    pub fn with_chain(chain: InterceptorChain) -> Self {
        let bindings = Arc::new(ScopeBindings::new());
        bindings.bind_factory_proxy(|execution| DelegateExecution::new(execution.clone()));

        let scope = Arc::new(ScopeManager::new(Arc::clone(&bindings)));
        let chain = chain
            .with(Arc::new(ScopeExecutionInterceptor::new()))
            .with(Arc::new(TracingInterceptor::new()));

        Self {
            session: ExecutionSession::new(Arc::clone(&scope), chain),
            bindings,
            scope,
        }
    }

    /// Returns the active execution.
    #[must_use]
    pub fn active(&self) -> Option<ExecutionHandle> {
        self.scope.context_execution()
    }

    /// Runs `body` as a step for `execution`.
    pub fn step<T, F>(&self, execution: &ExecutionHandle, body: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        self.session.execute(Some(execution.clone()), |_| body())
    }
}

impl Default for ScopeHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopeHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeHarness")
            .field("scope", &self.scope)
            .field("depth", &self.session.depth())
            .finish()
    }
}
