//! Business-process scope.
//!
//! This module provides:
//! - `ScopeBindings`: application-wide factories per capability
//! - `ScopeManager`: the per-request active execution and its scoped instances
//! - task-local helpers for hosts that run one tokio task per request

mod bindings;
mod manager;
mod request;
#[cfg(test)]
mod scope_tests;

pub use bindings::{Capability, ScopeBindings, ScopedFactory, ScopedInstance};
pub use manager::ScopeManager;
pub use request::{current_scope, sync_with_request_scope, with_request_scope};
