//! # BPMN Komponent
//!
//! Integration layer between a BPMN process engine and a host application.
//!
//! The engine runs process instances as nested execution steps. This crate
//! keeps a *business-process scope* in step with those steps so user code
//! can resolve instances bound to the execution currently being processed:
//!
//! - **Scope management**: the active execution and the instances scoped to
//!   it, owned per request
//! - **Interceptors**: a priority-ordered chain around every execution step,
//!   including the scope interceptor that enters and restores executions
//! - **Engine wiring**: a process engine factory that installs the scope
//!   interceptor and the delegate task factory
//! - **Delegates**: delegate tasks, task handlers and job handlers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bpmn_komponent::prelude::*;
//!
//! let komponent = Komponent::new(KomponentConfig::default());
//! komponent.task_factory().register::<ProcessOrder>();
//!
//! let engine = komponent.create_process_engine(&provider, connections)?;
//! let session = engine.open_session(komponent.open_scope());
//!
//! session.execute(Some(execution), |step| {
//!     let delegate = step.scope().resolve_scoped::<DelegateExecution>()?;
//!     delegate.set_variable("confirmed", serde_json::json!(true));
//!     Ok(())
//! })?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod delegate;
pub mod engine;
pub mod errors;
pub mod execution;
pub mod interceptors;
pub mod komponent;
pub mod observability;
pub mod scope;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EngineConfig, KomponentConfig, LoggingConfig};
    pub use crate::delegate::{
        DelegateExecution, DelegateTask, DelegateTaskFactory, Job, JobHandler, JobHandlerRegistry,
        RegistryDelegateTaskFactory, TaskHandler, TaskHandlerKey, TaskHandlerRegistry,
    };
    pub use crate::engine::{
        Connection, ConnectionManager, EngineProvider, ExecutionSession, ProcessEngine,
        ProcessEngineFactory,
    };
    pub use crate::errors::{
        CapabilityNotBoundError, HandlerError, InvalidStateError, KomponentError, ScopeError,
    };
    pub use crate::execution::{ExecutionHandle, ExecutionInfo, HandleToken};
    pub use crate::interceptors::{
        ExecutionChain, ExecutionInterceptor, InterceptorChain, ScopeExecutionInterceptor,
        StepContext, TracingInterceptor,
    };
    pub use crate::komponent::{Komponent, KOMPONENT_HOMEPAGE, KOMPONENT_KEY};
    pub use crate::observability::init_tracing;
    pub use crate::scope::{
        current_scope, with_request_scope, Capability, ScopeBindings, ScopeManager,
    };
}
