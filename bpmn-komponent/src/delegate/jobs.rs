//! Job handlers registered with the engine's job executor.

use crate::errors::HandlerError;
use crate::interceptors::StepContext;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A unit of deferred work scheduled by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// The job ID.
    pub id: Uuid,
    /// The handler type responsible for the job.
    pub handler_type: String,
    /// The execution the job belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    /// Handler-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
    /// When the job becomes due.
    pub scheduled_at: DateTime<Utc>,
}

impl Job {
    /// Creates a job that is due now.
    #[must_use]
    pub fn new(handler_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            handler_type: handler_type.into(),
            execution_id: None,
            data,
            scheduled_at: Utc::now(),
        }
    }

    /// Sets the owning execution.
    #[must_use]
    pub fn with_execution_id(mut self, execution_id: Uuid) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    /// Sets the due time.
    #[must_use]
    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = at;
        self
    }

    /// Returns true if the job is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }
}

/// Handler for one job type.
pub trait JobHandler: Send + Sync {
    /// Returns the job type this handler executes.
    fn job_type(&self) -> &str;

    /// Executes the job within the given step.
    fn execute_job(&self, job: &Job, step: &StepContext) -> anyhow::Result<()>;
}

/// Registry of job handlers keyed by job type.
#[derive(Default)]
pub struct JobHandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
}

impl JobHandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its job type.
    pub fn register(&self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        debug!(job_type = %job_type, "Registering job handler");

        if self.handlers.write().insert(job_type.clone(), handler).is_some() {
            warn!(job_type = %job_type, "Replaced existing job handler");
        }
    }

    /// Gets the handler for a job type.
    #[must_use]
    pub fn get(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.read().get(job_type).cloned()
    }

    /// Lists registered job types.
    #[must_use]
    pub fn job_types(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Executes a job with its registered handler.
    pub fn execute(&self, job: &Job, step: &StepContext) -> anyhow::Result<()> {
        let handler = self
            .get(&job.handler_type)
            .ok_or_else(|| HandlerError::job_handler_not_found(&job.handler_type))?;

        debug!(job_id = %job.id, job_type = %job.handler_type, "Executing job");
        handler.execute_job(job, step)
    }
}

impl std::fmt::Debug for JobHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandlerRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}
