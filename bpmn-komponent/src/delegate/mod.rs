//! User code invoked by the process engine.
//!
//! This module provides:
//! - `DelegateExecution`, the execution view user code works with
//! - delegate tasks and a registry-backed delegate task factory
//! - task handlers bound to task keys
//! - job handlers bound to job types

mod execution;
mod handlers;
mod jobs;
mod task;

pub use execution::DelegateExecution;
pub use handlers::{TaskHandler, TaskHandlerConstructor, TaskHandlerKey, TaskHandlerRegistry};
pub use jobs::{Job, JobHandler, JobHandlerRegistry};
pub use task::{
    DelegateTask, DelegateTaskConstructor, DelegateTaskFactory, RegistryDelegateTaskFactory,
};

#[cfg(test)]
pub use task::MockDelegateTaskFactory;
