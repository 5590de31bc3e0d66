//! Observability utilities.
//!
//! Engine steps are traced by [`crate::interceptors::TracingInterceptor`];
//! this module installs the subscriber that receives those spans and events.

mod subscriber;

pub use subscriber::{build_filter, init_tracing};
