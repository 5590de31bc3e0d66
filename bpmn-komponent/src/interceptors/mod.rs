//! Interceptors wrapped around engine execution steps.

mod chain;
mod scope;
mod trace;

pub use chain::{ExecutionChain, ExecutionInterceptor, InterceptorChain, StepContext};
pub use scope::{ScopeExecutionInterceptor, SCOPE_INTERCEPTOR_PRIORITY};
pub use trace::{TracingInterceptor, TRACING_INTERCEPTOR_PRIORITY};
