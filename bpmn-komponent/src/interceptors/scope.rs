//! Interceptor binding the business-process scope to each execution step.

use super::{ExecutionChain, ExecutionInterceptor, StepContext};
use crate::execution::ExecutionHandle;
use crate::scope::ScopeManager;
use tracing::trace;

/// Default priority of the scope interceptor.
pub const SCOPE_INTERCEPTOR_PRIORITY: i32 = 1000;

/// Keeps the active binding of the request's [`ScopeManager`] in step with
/// the execution step being performed.
///
/// For every step the interceptor captures the active execution, enters the
/// step's execution (if it has one), runs the rest of the chain, and then
/// restores the captured execution. The outermost step (depth 0) also clears
/// the scope so no instances leak into the next top-level operation.
/// Restoration runs on every exit path, including errors and panics.
#[derive(Debug, Clone, Copy)]
pub struct ScopeExecutionInterceptor {
    priority: i32,
}

impl ScopeExecutionInterceptor {
    /// Creates the interceptor with the default priority.
    #[must_use]
    pub fn new() -> Self {
        Self::with_priority(SCOPE_INTERCEPTOR_PRIORITY)
    }

    /// Creates the interceptor with a custom priority.
    #[must_use]
    pub fn with_priority(priority: i32) -> Self {
        Self { priority }
    }
}

impl Default for ScopeExecutionInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionInterceptor for ScopeExecutionInterceptor {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept_execution(
        &self,
        chain: ExecutionChain<'_>,
        step: &StepContext,
    ) -> anyhow::Result<()> {
        let scope = step.scope();
        let _restore = RestoreGuard {
            scope,
            previous: scope.context_execution(),
            clear: step.is_outermost(),
        };

        if let Some(execution) = step.execution() {
            scope.enter_context(Some(execution.clone()));
        }

        chain.perform_execution(step)
    }
}

/// Restores the captured binding when dropped.
struct RestoreGuard<'a> {
    scope: &'a ScopeManager,
    previous: Option<ExecutionHandle>,
    clear: bool,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.scope.enter_context(self.previous.take());

        if self.clear {
            trace!("Outermost execution step finished, clearing business-process scope");
            self.scope.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionInfo;
    use crate::interceptors::InterceptorChain;
    use crate::scope::ScopeBindings;
    use std::sync::Arc;

    fn setup() -> (Arc<ScopeManager>, InterceptorChain) {
        let bindings = Arc::new(ScopeBindings::new());
        bindings.bind_factory_proxy(|execution| execution.id());
        let scope = Arc::new(ScopeManager::new(bindings));
        let chain = InterceptorChain::new().with(Arc::new(ScopeExecutionInterceptor::new()));
        (scope, chain)
    }

    fn handle() -> ExecutionHandle {
        ExecutionHandle::new(ExecutionInfo::root())
    }

    #[test]
    fn test_default_priority() {
        assert_eq!(ScopeExecutionInterceptor::new().priority(), SCOPE_INTERCEPTOR_PRIORITY);
        assert_eq!(ScopeExecutionInterceptor::with_priority(-5).priority(), -5);
    }

    #[test]
    fn test_step_sees_its_execution() {
        let (scope, chain) = setup();
        let e0 = handle();
        let step = StepContext::new(Arc::clone(&scope), 0).with_execution(e0.clone());

        let seen = chain
            .execute(&step, |ctx| Ok(ctx.scope().context_execution()))
            .unwrap()
            .unwrap();

        assert!(seen.is_same_handle(&e0));
        assert!(scope.context_execution().is_none());
    }

    #[test]
    fn test_step_without_execution_keeps_binding() {
        let (scope, chain) = setup();
        let e0 = handle();
        scope.enter_context(Some(e0.clone()));

        let step = StepContext::new(Arc::clone(&scope), 1);
        let seen = chain
            .execute(&step, |ctx| Ok(ctx.scope().context_execution()))
            .unwrap()
            .unwrap();

        assert!(seen.is_same_handle(&e0));
        assert!(scope.context_execution().unwrap().is_same_handle(&e0));
    }

    #[test]
    fn test_nested_step_restores_outer_binding() {
        let (scope, chain) = setup();
        let e0 = handle();
        let e1 = handle();

        let outer = StepContext::new(Arc::clone(&scope), 0).with_execution(e0.clone());
        chain
            .execute(&outer, |ctx| {
                let inner = StepContext::new(Arc::clone(ctx.scope()), 1).with_execution(e1.clone());
                chain.execute(&inner, |ctx| {
                    assert!(ctx.scope().context_execution().unwrap().is_same_handle(&e1));
                    Ok(())
                })?;

                assert!(ctx.scope().context_execution().unwrap().is_same_handle(&e0));
                Ok(())
            })
            .unwrap();

        assert!(scope.context_execution().is_none());
    }

    #[test]
    fn test_nested_depth_does_not_clear() {
        let (scope, chain) = setup();
        let e0 = handle();
        scope.enter_context(Some(e0.clone()));
        scope.resolve_scoped::<uuid::Uuid>().unwrap();

        let inner = StepContext::new(Arc::clone(&scope), 1).with_execution(handle());
        chain.execute(&inner, |_| Ok(())).unwrap();

        assert_eq!(scope.cached_count(&e0), 1);
    }

    #[test]
    fn test_outermost_step_clears_instances() {
        let (scope, chain) = setup();
        let e0 = handle();

        let step = StepContext::new(Arc::clone(&scope), 0).with_execution(e0.clone());
        chain
            .execute(&step, |ctx| {
                ctx.scope().resolve_scoped::<uuid::Uuid>()?;
                Ok(())
            })
            .unwrap();

        assert_eq!(scope.cached_count(&e0), 0);
        assert!(scope.scoped_executions().is_empty());
    }

    #[test]
    fn test_failing_step_restores_binding() {
        let (scope, chain) = setup();
        let e0 = handle();
        scope.enter_context(Some(e0.clone()));

        let inner = StepContext::new(Arc::clone(&scope), 1).with_execution(handle());
        let result: anyhow::Result<()> = chain.execute(&inner, |_| anyhow::bail!("boom"));

        assert_eq!(result.unwrap_err().to_string(), "boom");
        assert!(scope.context_execution().unwrap().is_same_handle(&e0));
    }
}
