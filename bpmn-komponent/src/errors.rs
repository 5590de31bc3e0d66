//! Error types for the BPMN komponent.
//!
//! Scope errors signal misuse of execution-scoped capabilities. Failures of
//! engine steps are carried as `anyhow::Error` and are never wrapped by the
//! interceptor chain.

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for komponent operations.
#[derive(Debug, Error)]
pub enum KomponentError {
    /// A scoped capability could not be resolved.
    #[error("{0}")]
    Scope(#[from] ScopeError),

    /// A handler or delegate task lookup failed.
    #[error("{0}")]
    Handler(#[from] HandlerError),

    /// A named database connection could not be obtained.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external process engine reported a failure.
    #[error("Engine error: {0}")]
    Engine(#[from] anyhow::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while resolving execution-scoped instances.
#[derive(Debug, Clone, Error)]
pub enum ScopeError {
    /// No execution was active when the capability was resolved.
    #[error("{0}")]
    InvalidState(#[from] InvalidStateError),

    /// No factory was bound for the requested capability.
    #[error("{0}")]
    CapabilityNotBound(#[from] CapabilityNotBoundError),

    /// A cached instance did not have the type of its capability.
    #[error("Scoped instance for '{capability}' has an unexpected type")]
    TypeMismatch {
        /// The capability name.
        capability: String,
    },
}

/// Error raised when a scoped capability is used outside any execution step.
#[derive(Debug, Clone, Error)]
#[error("Cannot resolve business-process scoped '{capability}': no execution is active")]
pub struct InvalidStateError {
    /// The capability that was requested.
    pub capability: String,
}

impl InvalidStateError {
    /// Creates a new invalid state error.
    #[must_use]
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

/// Error raised when no scoped factory is registered for a capability.
#[derive(Debug, Clone, Error)]
#[error("No business-process scoped factory bound for '{capability}'")]
pub struct CapabilityNotBoundError {
    /// The capability that was requested.
    pub capability: String,
}

impl CapabilityNotBoundError {
    /// Creates a new capability-not-bound error.
    #[must_use]
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

/// Errors related to handler and delegate task lookup.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// No delegate task is registered under the type name.
    #[error("Delegate task not found: {type_name}")]
    DelegateTaskNotFound {
        /// The requested type name.
        type_name: String,
    },

    /// No task handler is bound to the task key.
    #[error(
        "Task handler not found for task '{task_key}' in process '{}'",
        .process_key.as_deref().unwrap_or("*")
    )]
    TaskHandlerNotFound {
        /// The task definition key.
        task_key: String,
        /// The process definition key, if any.
        process_key: Option<String>,
    },

    /// No job handler is registered for the job type.
    #[error("Job handler not found: {job_type}")]
    JobHandlerNotFound {
        /// The job type.
        job_type: String,
    },
}

impl HandlerError {
    /// Creates a delegate task not found error.
    #[must_use]
    pub fn delegate_task_not_found(type_name: impl Into<String>) -> Self {
        Self::DelegateTaskNotFound {
            type_name: type_name.into(),
        }
    }

    /// Creates a task handler not found error.
    #[must_use]
    pub fn task_handler_not_found(task_key: impl Into<String>, process_key: Option<&str>) -> Self {
        Self::TaskHandlerNotFound {
            task_key: task_key.into(),
            process_key: process_key.map(String::from),
        }
    }

    /// Creates a job handler not found error.
    #[must_use]
    pub fn job_handler_not_found(job_type: impl Into<String>) -> Self {
        Self::JobHandlerNotFound {
            job_type: job_type.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::DelegateTaskNotFound { type_name } => {
                map.insert("type".to_string(), json!("DelegateTaskNotFound"));
                map.insert("type_name".to_string(), json!(type_name));
            }
            Self::TaskHandlerNotFound {
                task_key,
                process_key,
            } => {
                map.insert("type".to_string(), json!("TaskHandlerNotFound"));
                map.insert("task_key".to_string(), json!(task_key));
                map.insert("process_key".to_string(), json!(process_key));
            }
            Self::JobHandlerNotFound { job_type } => {
                map.insert("type".to_string(), json!("JobHandlerNotFound"));
                map.insert("job_type".to_string(), json!(job_type));
            }
        }

        map.insert("message".to_string(), json!(self.to_string()));
        map
    }
}
