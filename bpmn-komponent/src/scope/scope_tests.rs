//! Scope behavior driven through the interceptor chain.

use super::*;
use crate::errors::ScopeError;
use crate::execution::{ExecutionHandle, ExecutionInfo};
use crate::interceptors::{InterceptorChain, ScopeExecutionInterceptor, StepContext};
use anyhow::anyhow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scoped value that remembers which handle it was created for.
#[derive(Debug)]
struct ExecutionView {
    execution: ExecutionHandle,
    serial: usize,
}

impl PartialEq for ExecutionView {
    fn eq(&self, other: &Self) -> bool {
        self.execution == other.execution
    }
}

struct Fixture {
    scope: Arc<ScopeManager>,
    chain: InterceptorChain,
    created: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);

        let bindings = Arc::new(ScopeBindings::new());
        bindings.bind_factory_proxy(move |execution| ExecutionView {
            execution: execution.clone(),
            serial: counter.fetch_add(1, Ordering::SeqCst),
        });

        Self {
            scope: Arc::new(ScopeManager::new(bindings)),
            chain: InterceptorChain::new().with(Arc::new(ScopeExecutionInterceptor::new())),
            created,
        }
    }

    fn step(&self, depth: usize, execution: &ExecutionHandle) -> StepContext {
        StepContext::new(Arc::clone(&self.scope), depth).with_execution(execution.clone())
    }

    fn active(&self) -> Option<ExecutionHandle> {
        self.scope.context_execution()
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

fn execution() -> ExecutionHandle {
    ExecutionHandle::new(ExecutionInfo::root().with_activity_id("start"))
}

#[test]
fn test_nested_steps_observe_innermost_execution() {
    let fx = Fixture::new();
    let outer = execution();
    let inner = execution();

    fx.chain
        .execute(&fx.step(0, &outer), |_| {
            assert!(fx.active().unwrap().is_same_handle(&outer));

            fx.chain.execute(&fx.step(1, &inner), |_| {
                assert!(fx.active().unwrap().is_same_handle(&inner));
                Ok(())
            })?;

            assert!(fx.active().unwrap().is_same_handle(&outer));
            Ok(())
        })
        .unwrap();

    assert!(fx.active().is_none());
    assert!(fx.scope.scoped_executions().is_empty());
}

#[test]
fn test_step_without_execution_keeps_binding() {
    let fx = Fixture::new();
    let outer = execution();

    fx.chain
        .execute(&fx.step(0, &outer), |_| {
            let bare = StepContext::new(Arc::clone(&fx.scope), 1);
            fx.chain.execute(&bare, |_| {
                assert!(fx.active().unwrap().is_same_handle(&outer));
                Ok(())
            })
        })
        .unwrap();
}

#[test]
fn test_destroy_twice_leaves_state_unchanged() {
    let fx = Fixture::new();
    let outer = execution();
    let other = execution();

    fx.chain
        .execute(&fx.step(0, &outer), |_| {
            fx.scope.resolve_scoped::<ExecutionView>()?;

            assert_eq!(fx.scope.destroy_context(&other), 0);
            assert_eq!(fx.scope.cached_count(&outer), 1);

            assert_eq!(fx.scope.destroy_context(&outer), 1);
            assert_eq!(fx.scope.destroy_context(&outer), 0);
            assert_eq!(fx.scope.cached_count(&outer), 0);
            assert!(fx.active().unwrap().is_same_handle(&outer));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_scoped_instances_follow_handle_identity() {
    let fx = Fixture::new();
    let outer = execution();
    let reentered = outer.reload();

    fx.chain
        .execute(&fx.step(0, &outer), |_| {
            let first = fx.scope.resolve_scoped::<ExecutionView>()?;

            let nested = fx.chain.execute(&fx.step(1, &reentered), |_| {
                Ok(fx.scope.resolve_scoped::<ExecutionView>()?)
            })?;

            let again = fx.scope.resolve_scoped::<ExecutionView>()?;

            assert!(Arc::ptr_eq(&first, &again));
            assert!(!Arc::ptr_eq(&first, &nested));
            assert_eq!(*first, *nested);
            assert_ne!(first.serial, nested.serial);
            assert!(nested.execution.is_same_handle(&reentered));
            Ok(())
        })
        .unwrap();

    assert_eq!(fx.created(), 2);
}

#[test]
fn test_resolve_outside_step_fails_without_caching() {
    let fx = Fixture::new();

    let err = fx.scope.resolve_scoped::<ExecutionView>().unwrap_err();

    assert!(matches!(err, ScopeError::InvalidState(_)));
    assert!(fx.scope.scoped_executions().is_empty());
    assert_eq!(fx.created(), 0);
}

#[test]
fn test_outermost_exit_discards_cached_instances() {
    let fx = Fixture::new();
    let outer = execution();

    let first = fx
        .chain
        .execute(&fx.step(0, &outer), |_| Ok(fx.scope.resolve_scoped::<ExecutionView>()?))
        .unwrap();
    let second = fx
        .chain
        .execute(&fx.step(0, &outer), |_| Ok(fx.scope.resolve_scoped::<ExecutionView>()?))
        .unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(fx.created(), 2);
}

#[test]
fn test_failed_nested_step_restores_binding() {
    let fx = Fixture::new();
    let outer = execution();
    let inner = execution();

    fx.chain
        .execute(&fx.step(0, &outer), |_| {
            let result = fx.chain.execute::<(), _>(&fx.step(1, &inner), |_| {
                Err(anyhow!("message correlation failed"))
            });

            let err = result.unwrap_err();
            assert_eq!(err.to_string(), "message correlation failed");
            assert!(fx.active().unwrap().is_same_handle(&outer));
            Ok(())
        })
        .unwrap();

    assert!(fx.active().is_none());
}

#[test]
fn test_panicking_nested_step_restores_binding() {
    let fx = Fixture::new();
    let outer = execution();
    let inner = execution();

    fx.chain
        .execute(&fx.step(0, &outer), |_| {
            let panicked = catch_unwind(AssertUnwindSafe(|| {
                let _ = fx
                    .chain
                    .execute::<(), _>(&fx.step(1, &inner), |_| panic!("delegate task panicked"));
            }));

            assert!(panicked.is_err());
            assert!(fx.active().unwrap().is_same_handle(&outer));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_failed_outermost_step_still_clears() {
    let fx = Fixture::new();
    let outer = execution();

    let err = fx
        .chain
        .execute::<(), _>(&fx.step(0, &outer), |_| {
            fx.scope.resolve_scoped::<ExecutionView>()?;
            Err(anyhow!("delegate task failed"))
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "delegate task failed");
    assert!(fx.active().is_none());
    assert!(fx.scope.scoped_executions().is_empty());
}
