//! The BPMN komponent: wires the process engine into a host application.

use crate::config::KomponentConfig;
use crate::delegate::{
    DelegateExecution, JobHandlerRegistry, RegistryDelegateTaskFactory, TaskHandlerRegistry,
};
use crate::engine::{ConnectionManager, EngineProvider, ProcessEngineFactory};
use crate::errors::KomponentError;
use crate::scope::{ScopeBindings, ScopeManager};
use std::sync::Arc;
use tracing::{debug, info};

/// Key identifying the komponent.
pub const KOMPONENT_KEY: &str = "koolkode/bpmn-komponent";

/// Project homepage.
pub const KOMPONENT_HOMEPAGE: &str = "https://github.com/koolkode/bpmn-komponent";

/// Application-wide state of the BPMN integration.
///
/// Holds the scope bindings shared by every request, the delegate task
/// factory and the handler registries. `DelegateExecution` is bound as a
/// business-process scoped capability on construction.
pub struct Komponent {
    config: KomponentConfig,
    bindings: Arc<ScopeBindings>,
    task_factory: Arc<RegistryDelegateTaskFactory>,
    task_handlers: Arc<TaskHandlerRegistry>,
    job_handlers: Arc<JobHandlerRegistry>,
}

impl Komponent {
    /// Creates the komponent.
    #[must_use]
    pub fn new(config: KomponentConfig) -> Self {
        let bindings = Arc::new(ScopeBindings::new());
        bindings.bind_factory_proxy(|execution| DelegateExecution::new(execution.clone()));

        info!(key = KOMPONENT_KEY, "Loaded BPMN komponent");

        Self {
            config,
            bindings,
            task_factory: Arc::new(RegistryDelegateTaskFactory::new()),
            task_handlers: Arc::new(TaskHandlerRegistry::new()),
            job_handlers: Arc::new(JobHandlerRegistry::new()),
        }
    }

    /// Returns the komponent key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        KOMPONENT_KEY
    }

    /// Returns the project homepage.
    #[must_use]
    pub fn homepage(&self) -> &'static str {
        KOMPONENT_HOMEPAGE
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &KomponentConfig {
        &self.config
    }

    /// Returns the scope bindings shared by all requests.
    #[must_use]
    pub fn bindings(&self) -> &Arc<ScopeBindings> {
        &self.bindings
    }

    /// Returns the delegate task factory.
    #[must_use]
    pub fn task_factory(&self) -> &Arc<RegistryDelegateTaskFactory> {
        &self.task_factory
    }

    /// Returns the task handler registry.
    #[must_use]
    pub fn task_handlers(&self) -> &Arc<TaskHandlerRegistry> {
        &self.task_handlers
    }

    /// Returns the job handler registry.
    #[must_use]
    pub fn job_handlers(&self) -> &Arc<JobHandlerRegistry> {
        &self.job_handlers
    }

    /// Creates the scope manager for a new request.
    #[must_use]
    pub fn open_scope(&self) -> Arc<ScopeManager> {
        debug!("Opening business-process scope");
        Arc::new(ScopeManager::new(Arc::clone(&self.bindings)))
    }

    /// Creates an engine factory using `connection_manager` and this
    /// komponent's delegate task factory.
    #[must_use]
    pub fn engine_factory(
        &self,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> ProcessEngineFactory {
        let mut factory = ProcessEngineFactory::new()
            .with_scope_interceptor_priority(self.config.scope_interceptor_priority);
        factory.set_connection_manager(connection_manager);
        factory.set_task_factory(self.task_factory.clone());
        factory.set_task_handlers(Arc::clone(&self.task_handlers));
        factory.set_job_handlers(Arc::clone(&self.job_handlers));
        factory
    }

    /// Creates a process engine from the configured engine settings.
    pub fn create_process_engine<P>(
        &self,
        provider: &P,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Result<P::Engine, KomponentError>
    where
        P: EngineProvider,
    {
        self.engine_factory(connection_manager)
            .create_process_engine(provider, &self.config.engine)
    }
}

impl Default for Komponent {
    fn default() -> Self {
        Self::new(KomponentConfig::default())
    }
}

impl std::fmt::Debug for Komponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Komponent")
            .field("key", &KOMPONENT_KEY)
            .field("config", &self.config)
            .field("bindings", &self.bindings)
            .field("task_factory", &self.task_factory)
            .field("task_handlers", &self.task_handlers)
            .field("job_handlers", &self.job_handlers)
            .finish()
    }
}
