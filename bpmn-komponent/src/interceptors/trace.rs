//! Interceptor recording a tracing span per execution step.

use super::{ExecutionChain, ExecutionInterceptor, StepContext};
use std::time::Instant;
use tracing::{debug, debug_span, field, warn};

/// Default priority of the tracing interceptor; it wraps the scope interceptor.
pub const TRACING_INTERCEPTOR_PRIORITY: i32 = -100;

/// Opens a `tracing` span around each execution step and logs its outcome.
#[derive(Debug, Clone, Copy)]
pub struct TracingInterceptor {
    priority: i32,
}

impl TracingInterceptor {
    /// Creates a tracing interceptor with the default priority.
    #[must_use]
    pub fn new() -> Self {
        Self {
            priority: TRACING_INTERCEPTOR_PRIORITY,
        }
    }
}

impl Default for TracingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionInterceptor for TracingInterceptor {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept_execution(
        &self,
        chain: ExecutionChain<'_>,
        step: &StepContext,
    ) -> anyhow::Result<()> {
        let span = debug_span!(
            "execution_step",
            depth = step.depth(),
            execution_id = field::Empty,
            activity_id = field::Empty,
        );
        if let Some(execution) = step.execution() {
            span.record("execution_id", field::display(execution.id()));
            if let Some(activity) = execution.activity_id() {
                span.record("activity_id", activity);
            }
        }
        let _entered = span.enter();

        let started = Instant::now();
        let result = chain.perform_execution(step);
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(()) => debug!(duration_ms, "Execution step completed"),
            Err(error) => warn!(duration_ms, error = %error, "Execution step failed"),
        }

        result
    }
}
