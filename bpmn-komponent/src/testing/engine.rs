//! In-memory process engine for tests.

use crate::delegate::{
    DelegateExecution, DelegateTaskFactory, Job, JobHandlerRegistry, TaskHandlerRegistry,
};
use crate::engine::{Connection, EngineProvider, ExecutionSession, ProcessEngine};
use crate::execution::ExecutionHandle;
use crate::interceptors::{ExecutionInterceptor, InterceptorChain, StepContext};
use crate::scope::ScopeManager;
use anyhow::anyhow;
use std::sync::Arc;

/// A process engine that only records its configuration and runs steps
/// through its interceptors.
pub struct InMemoryProcessEngine {
    connection: Arc<dyn Connection>,
    transactional: bool,
    task_factory: Option<Arc<dyn DelegateTaskFactory>>,
    task_handlers: Option<Arc<TaskHandlerRegistry>>,
    job_handlers: Option<Arc<JobHandlerRegistry>>,
    interceptors: InterceptorChain,
}

impl InMemoryProcessEngine {
    /// Creates an engine on `connection`.
    #[must_use]
    pub fn new(connection: Arc<dyn Connection>, transactional: bool) -> Self {
        Self {
            connection,
            transactional,
            task_factory: None,
            task_handlers: None,
            job_handlers: None,
            interceptors: InterceptorChain::new(),
        }
    }

    /// Returns the name of the engine's connection.
    #[must_use]
    pub fn connection_name(&self) -> &str {
        self.connection.name()
    }

    /// Returns true if the engine runs commands in transactions.
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Returns true if a delegate task factory was set.
    #[must_use]
    pub fn has_task_factory(&self) -> bool {
        self.task_factory.is_some()
    }

    /// Returns the job types the engine's job executor can run.
    #[must_use]
    pub fn job_types(&self) -> Vec<String> {
        self.job_handlers
            .as_ref()
            .map_or_else(Vec::new, |handlers| handlers.job_types())
    }

    /// Returns the registered interceptors.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Opens a session for one request.
    #[must_use]
    pub fn open_session(&self, scope: Arc<ScopeManager>) -> ExecutionSession {
        ExecutionSession::new(scope, self.interceptors.clone())
    }

    /// Instantiates the delegate task `type_name` and runs it.
    pub fn execute_delegate_task(
        &self,
        type_name: &str,
        execution: &DelegateExecution,
    ) -> anyhow::Result<()> {
        let factory = self
            .task_factory
            .as_ref()
            .ok_or_else(|| anyhow!("no delegate task factory set"))?;

        factory.create_delegate_task(type_name)?.execute(execution)
    }

    /// Runs the task handler for `task_key` inside `step`.
    pub fn handle_user_task(
        &self,
        step: &StepContext,
        process_key: Option<&str>,
        task_key: &str,
    ) -> anyhow::Result<()> {
        let handlers = self
            .task_handlers
            .as_ref()
            .ok_or_else(|| anyhow!("no task handlers set"))?;

        handlers.dispatch(step, process_key, task_key)
    }

    /// Runs `job` as an execution step of `session`.
    pub fn execute_job(
        &self,
        session: &ExecutionSession,
        job: &Job,
        execution: Option<ExecutionHandle>,
    ) -> anyhow::Result<()> {
        let handlers = self
            .job_handlers
            .as_ref()
            .ok_or_else(|| anyhow!("no job handlers set"))?;

        session.execute_job(handlers, job, execution)
    }
}

impl ProcessEngine for InMemoryProcessEngine {
    fn set_delegate_task_factory(&mut self, factory: Arc<dyn DelegateTaskFactory>) {
        self.task_factory = Some(factory);
    }

    fn register_interceptor(&mut self, interceptor: Arc<dyn ExecutionInterceptor>) {
        self.interceptors.add(interceptor);
    }

    fn set_task_handlers(&mut self, handlers: Arc<TaskHandlerRegistry>) {
        self.task_handlers = Some(handlers);
    }

    fn set_job_handlers(&mut self, handlers: Arc<JobHandlerRegistry>) {
        self.job_handlers = Some(handlers);
    }
}

impl std::fmt::Debug for InMemoryProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProcessEngine")
            .field("connection", &self.connection.name())
            .field("transactional", &self.transactional)
            .field("job_types", &self.job_types())
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

/// Provider creating [`InMemoryProcessEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryEngineProvider;

impl EngineProvider for InMemoryEngineProvider {
    type Engine = InMemoryProcessEngine;

    fn create_engine(
        &self,
        connection: Arc<dyn Connection>,
        transactional: bool,
    ) -> anyhow::Result<InMemoryProcessEngine> {
        Ok(InMemoryProcessEngine::new(connection, transactional))
    }
}
