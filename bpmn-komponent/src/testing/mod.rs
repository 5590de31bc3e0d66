//! Testing utilities for code running inside process engine steps.
//!
//! This module provides:
//! - An in-memory process engine and provider
//! - Mock interceptors, delegate tasks, task handlers and connections
//! - A scope harness and execution builder
//! - Assertions on scope state

mod assertions;
mod engine;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_active_execution, assert_no_active_execution, assert_scope_cleared, assert_variable,
};
pub use engine::{InMemoryEngineProvider, InMemoryProcessEngine};
pub use fixtures::{ScopeHarness, TestExecution};
pub use mocks::{
    FailingDelegateTask, RecordedStep, RecordingDelegateTask, RecordingInterceptor, StubConnection,
    VerifyingTaskHandler,
};
