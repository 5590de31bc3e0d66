//! Mock interceptors, delegate tasks, handlers and connections.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::delegate::{DelegateExecution, DelegateTask, TaskHandler};
use crate::engine::Connection;
use crate::interceptors::{ExecutionChain, ExecutionInterceptor, StepContext};
use crate::scope::ScopeManager;

/// A step observed by a [`RecordingInterceptor`].
#[derive(Debug, Clone)]
pub struct RecordedStep {
    /// Nesting depth of the step.
    pub depth: usize,
    /// The step's execution ID, if the step carried one.
    pub execution_id: Option<Uuid>,
    /// The execution active when the step body ran.
    pub active_execution_id: Option<Uuid>,
    /// When the step started.
    pub started_at: DateTime<Utc>,
    /// Whether the step succeeded.
    pub succeeded: bool,
}

/// An interceptor that records every step it wraps.
#[derive(Debug)]
pub struct RecordingInterceptor {
    priority: i32,
    steps: Mutex<Vec<RecordedStep>>,
}

impl RecordingInterceptor {
    /// Creates a recording interceptor at the given priority.
    #[must_use]
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            steps: Mutex::new(Vec::new()),
        }
    }

    /// Returns all recorded steps in completion order.
    #[must_use]
    pub fn steps(&self) -> Vec<RecordedStep> {
        self.steps.lock().clone()
    }

    /// Returns the number of recorded steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.lock().len()
    }

    /// Clears recorded steps.
    pub fn clear(&self) {
        self.steps.lock().clear();
    }
}

impl ExecutionInterceptor for RecordingInterceptor {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept_execution(
        &self,
        chain: ExecutionChain<'_>,
        step: &StepContext,
    ) -> anyhow::Result<()> {
        let started_at = Utc::now();
        let active_execution_id = step.scope().context_execution().map(|e| e.id());

        let result = chain.perform_execution(step);

        self.steps.lock().push(RecordedStep {
            depth: step.depth(),
            execution_id: step.execution().map(|e| e.id()),
            active_execution_id,
            started_at,
            succeeded: result.is_ok(),
        });
        result
    }
}

/// A delegate task that stamps its type name into the `processor` variable.
#[derive(Debug, Default)]
pub struct RecordingDelegateTask;

impl DelegateTask for RecordingDelegateTask {
    fn execute(&self, execution: &DelegateExecution) -> anyhow::Result<()> {
        execution.set_variable("processor", json!(std::any::type_name::<Self>()));
        Ok(())
    }
}

/// A delegate task that always fails.
#[derive(Debug)]
pub struct FailingDelegateTask {
    error: String,
}

impl FailingDelegateTask {
    /// Creates a failing task with the given message.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

impl Default for FailingDelegateTask {
    fn default() -> Self {
        Self::new("delegate task failed")
    }
}

impl DelegateTask for FailingDelegateTask {
    fn execute(&self, _execution: &DelegateExecution) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("{}", self.error))
    }
}

/// A task handler that checks it is re-bound to the execution it runs for.
///
/// On each call it resolves the execution-scoped [`DelegateExecution`] and
/// compares it with the one passed in. They must be equal but distinct
/// objects. The outcome lands in the `executionVerified` variable, and the
/// handler's type name in `handler`.
#[derive(Debug)]
pub struct VerifyingTaskHandler {
    scope: Arc<ScopeManager>,
}

impl VerifyingTaskHandler {
    /// Creates a handler resolving from `scope`.
    #[must_use]
    pub fn new(scope: Arc<ScopeManager>) -> Self {
        Self { scope }
    }
}

impl TaskHandler for VerifyingTaskHandler {
    fn execute_task(&self, execution: &DelegateExecution) -> anyhow::Result<()> {
        let contextual = self.scope.resolve_scoped::<DelegateExecution>()?;
        let verified =
            *contextual == *execution && !std::ptr::eq(Arc::as_ptr(&contextual), execution);

        execution.set_variable("handler", json!(std::any::type_name::<Self>()));
        execution.set_variable("executionVerified", json!(verified));
        Ok(())
    }
}

/// A connection that only has a name.
#[derive(Debug, Clone)]
pub struct StubConnection {
    name: String,
}

impl StubConnection {
    /// Creates a connection named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Connection for StubConnection {
    fn name(&self) -> &str {
        &self.name
    }
}
