//! Process engine wiring.
//!
//! This module provides:
//! - Traits for the external engine, its provider and database connections
//! - `ProcessEngineFactory`, which builds engines wired into the scope
//! - `ExecutionSession`, which runs nested execution steps for one request

mod factory;
mod session;

#[cfg(test)]
mod integration_tests;

pub use factory::{
    Connection, ConnectionManager, EngineProvider, ProcessEngine, ProcessEngineFactory,
};
pub use session::ExecutionSession;

#[cfg(test)]
pub use factory::{MockConnectionManager, MockProcessEngine};
