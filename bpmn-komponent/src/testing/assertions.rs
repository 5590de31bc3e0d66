//! Test assertions for scope state and execution variables.

use crate::execution::ExecutionHandle;
use crate::scope::ScopeManager;

/// Asserts that `expected` is the active execution handle.
pub fn assert_active_execution(scope: &ScopeManager, expected: &ExecutionHandle) {
    let active = scope.context_execution();
    assert!(
        active.as_ref().is_some_and(|a| a.is_same_handle(expected)),
        "Expected active execution {expected}, got {:?}",
        active.map(|a| a.to_string())
    );
}

/// Asserts that no execution is active.
pub fn assert_no_active_execution(scope: &ScopeManager) {
    let active = scope.context_execution();
    assert!(
        active.is_none(),
        "Expected no active execution, got {:?}",
        active.map(|a| a.to_string())
    );
}

/// Asserts that no scoped instances are cached for any execution.
pub fn assert_scope_cleared(scope: &ScopeManager) {
    let owners = scope.scoped_executions();
    assert!(
        owners.is_empty(),
        "Expected cleared scope, {} execution(s) still own instances",
        owners.len()
    );
}

/// Asserts that an execution variable has the expected value.
pub fn assert_variable(execution: &ExecutionHandle, name: &str, expected: &serde_json::Value) {
    assert_eq!(
        execution.variable(name).as_ref(),
        Some(expected),
        "Unexpected value for variable '{}'. Variables: {:?}",
        name,
        execution.variables()
    );
}
