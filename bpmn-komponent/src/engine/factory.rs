//! Process engine construction.

use crate::config::EngineConfig;
use crate::delegate::{DelegateTaskFactory, JobHandlerRegistry, TaskHandlerRegistry};
use crate::errors::KomponentError;
use crate::interceptors::{
    ExecutionInterceptor, ScopeExecutionInterceptor, TracingInterceptor, SCOPE_INTERCEPTOR_PRIORITY,
};
use std::sync::Arc;
use tracing::{debug, info};

/// A named database connection.
pub trait Connection: Send + Sync {
    /// Returns the connection name.
    fn name(&self) -> &str;
}

/// Hands out database connections by name.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionManager: Send + Sync {
    /// Returns the connection registered under `name`.
    fn connection(&self, name: &str) -> Result<Arc<dyn Connection>, KomponentError>;
}

/// The parts of a process engine the komponent configures.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessEngine: Send + Sync {
    /// Sets the factory used to instantiate delegate tasks.
    fn set_delegate_task_factory(&mut self, factory: Arc<dyn DelegateTaskFactory>);

    /// Adds an interceptor wrapped around every execution step.
    fn register_interceptor(&mut self, interceptor: Arc<dyn ExecutionInterceptor>);

    /// Sets the registry consulted when a user task is handled.
    fn set_task_handlers(&mut self, handlers: Arc<TaskHandlerRegistry>);

    /// Sets the registry the job executor runs jobs with.
    fn set_job_handlers(&mut self, handlers: Arc<JobHandlerRegistry>);
}

/// Builds process engines on top of a database connection.
pub trait EngineProvider {
    /// The engine type produced.
    type Engine: ProcessEngine;

    /// Creates an engine using `connection`.
    fn create_engine(
        &self,
        connection: Arc<dyn Connection>,
        transactional: bool,
    ) -> anyhow::Result<Self::Engine>;
}

/// Creates process engines wired into the business-process scope.
///
/// Every engine created gets the scope interceptor and the tracing
/// interceptor. The delegate task factory and the handler registries are
/// installed when set.
#[derive(Clone)]
pub struct ProcessEngineFactory {
    connection_manager: Option<Arc<dyn ConnectionManager>>,
    task_factory: Option<Arc<dyn DelegateTaskFactory>>,
    task_handlers: Option<Arc<TaskHandlerRegistry>>,
    job_handlers: Option<Arc<JobHandlerRegistry>>,
    scope_priority: i32,
}

impl ProcessEngineFactory {
    /// Creates a factory with no connection manager and no task factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection_manager: None,
            task_factory: None,
            task_handlers: None,
            job_handlers: None,
            scope_priority: SCOPE_INTERCEPTOR_PRIORITY,
        }
    }

    /// Sets the connection manager.
    pub fn set_connection_manager(&mut self, connection_manager: Arc<dyn ConnectionManager>) {
        self.connection_manager = Some(connection_manager);
    }

    /// Sets the delegate task factory handed to created engines.
    pub fn set_task_factory(&mut self, task_factory: Arc<dyn DelegateTaskFactory>) {
        self.task_factory = Some(task_factory);
    }

    /// Sets the task handler registry handed to created engines.
    pub fn set_task_handlers(&mut self, task_handlers: Arc<TaskHandlerRegistry>) {
        self.task_handlers = Some(task_handlers);
    }

    /// Sets the job handler registry handed to created engines.
    pub fn set_job_handlers(&mut self, job_handlers: Arc<JobHandlerRegistry>) {
        self.job_handlers = Some(job_handlers);
    }

    /// Sets the priority of the scope interceptor.
    #[must_use]
    pub fn with_scope_interceptor_priority(mut self, priority: i32) -> Self {
        self.scope_priority = priority;
        self
    }

    /// Returns the scope interceptor priority.
    #[must_use]
    pub fn scope_interceptor_priority(&self) -> i32 {
        self.scope_priority
    }

    /// Creates a process engine for the configured connection.
    ///
    /// # Errors
    ///
    /// Fails with [`KomponentError::Config`] when no connection manager is
    /// set. Connection lookup errors and engine provider failures are
    /// returned as-is.
    pub fn create_process_engine<P>(
        &self,
        provider: &P,
        config: &EngineConfig,
    ) -> Result<P::Engine, KomponentError>
    where
        P: EngineProvider,
    {
        let connection_manager = self.connection_manager.as_ref().ok_or_else(|| {
            KomponentError::Config("process engine factory has no connection manager".to_string())
        })?;

        let connection = connection_manager.connection(&config.connection)?;
        debug!(connection = %connection.name(), "Obtained process engine connection");

        let mut engine = provider.create_engine(connection, config.transactional)?;

        if let Some(ref task_factory) = self.task_factory {
            engine.set_delegate_task_factory(Arc::clone(task_factory));
        }
        if let Some(ref task_handlers) = self.task_handlers {
            engine.set_task_handlers(Arc::clone(task_handlers));
        }
        if let Some(ref job_handlers) = self.job_handlers {
            debug!(job_types = ?job_handlers.job_types(), "Registering job handlers with engine");
            engine.set_job_handlers(Arc::clone(job_handlers));
        }
        engine.register_interceptor(Arc::new(ScopeExecutionInterceptor::with_priority(
            self.scope_priority,
        )));
        engine.register_interceptor(Arc::new(TracingInterceptor::new()));

        info!(
            connection = %config.connection,
            transactional = config.transactional,
            scope_priority = self.scope_priority,
            "Created process engine"
        );
        Ok(engine)
    }
}

impl Default for ProcessEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessEngineFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngineFactory")
            .field("has_connection_manager", &self.connection_manager.is_some())
            .field("has_task_factory", &self.task_factory.is_some())
            .field("has_task_handlers", &self.task_handlers.is_some())
            .field("has_job_handlers", &self.job_handlers.is_some())
            .field("scope_priority", &self.scope_priority)
            .finish()
    }
}
