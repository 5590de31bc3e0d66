//! Execution identity as observed from the process engine.
//!
//! The komponent never creates or destroys executions. It only holds
//! handles the engine passes into each execution step.

mod handle;

pub use handle::{ExecutionHandle, ExecutionInfo, HandleToken};
