//! Per-request driver for engine execution steps.

use crate::delegate::{Job, JobHandlerRegistry};
use crate::execution::ExecutionHandle;
use crate::interceptors::{InterceptorChain, StepContext};
use crate::scope::ScopeManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Runs engine execution steps for one request.
///
/// The session owns the request's [`ScopeManager`] and tracks how deeply
/// steps are nested, so the interceptor chain sees depth 0 only for the
/// outermost step.
#[derive(Debug)]
pub struct ExecutionSession {
    scope: Arc<ScopeManager>,
    chain: InterceptorChain,
    depth: AtomicUsize,
}

impl ExecutionSession {
    /// Creates a session over `scope` using the engine's interceptors.
    #[must_use]
    pub fn new(scope: Arc<ScopeManager>, chain: InterceptorChain) -> Self {
        Self {
            scope,
            chain,
            depth: AtomicUsize::new(0),
        }
    }

    /// Returns the request's scope manager.
    #[must_use]
    pub fn scope(&self) -> &Arc<ScopeManager> {
        &self.scope
    }

    /// Returns the interceptor chain.
    #[must_use]
    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Returns the number of steps currently running.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Runs `body` as an execution step for `execution`.
    ///
    /// Steps started from inside `body` are nested one level deeper.
    pub fn execute<T, F>(&self, execution: Option<ExecutionHandle>, body: F) -> anyhow::Result<T>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<T>,
    {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst);
        let _guard = DepthGuard(&self.depth);

        let mut step = StepContext::new(Arc::clone(&self.scope), depth);
        if let Some(execution) = execution {
            step = step.with_execution(execution);
        }

        self.chain.execute(&step, body)
    }

    /// Runs `job` with its registered handler as an execution step.
    ///
    /// The job's execution, when given, is active in the scope for the
    /// duration of the handler.
    pub fn execute_job(
        &self,
        handlers: &JobHandlerRegistry,
        job: &Job,
        execution: Option<ExecutionHandle>,
    ) -> anyhow::Result<()> {
        debug!(job_id = %job.id, job_type = %job.handler_type, "Running job step");
        self.execute(execution, |step| handlers.execute(job, step))
    }
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
