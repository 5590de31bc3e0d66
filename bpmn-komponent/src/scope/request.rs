//! Task-local access to the scope manager of the current request.
//!
//! Hosts running one tokio task per request can install the request's
//! [`ScopeManager`] here instead of threading it through every call. The
//! slot is task-local: concurrent tasks never see each other's manager.

use super::ScopeManager;
use std::future::Future;
use std::sync::Arc;

tokio::task_local! {
    static REQUEST_SCOPE: Arc<ScopeManager>;
}

/// Runs a future with `scope` installed as the current request scope.
pub async fn with_request_scope<F>(scope: Arc<ScopeManager>, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_SCOPE.scope(scope, future).await
}

/// Runs a closure with `scope` installed as the current request scope.
pub fn sync_with_request_scope<F, R>(scope: Arc<ScopeManager>, f: F) -> R
where
    F: FnOnce() -> R,
{
    REQUEST_SCOPE.sync_scope(scope, f)
}

/// Returns the scope manager installed for the current task, if any.
#[must_use]
pub fn current_scope() -> Option<Arc<ScopeManager>> {
    REQUEST_SCOPE.try_with(Arc::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionHandle, ExecutionInfo};
    use crate::scope::ScopeBindings;

    fn new_scope() -> Arc<ScopeManager> {
        Arc::new(ScopeManager::new(Arc::new(ScopeBindings::new())))
    }

    #[test]
    fn test_no_scope_outside_request() {
        assert!(current_scope().is_none());
    }

    #[test]
    fn test_sync_scope_installs_manager() {
        let scope = new_scope();
        let seen = sync_with_request_scope(Arc::clone(&scope), || current_scope().unwrap());
        assert!(Arc::ptr_eq(&scope, &seen));
        assert!(current_scope().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_isolated() {
        let mut tasks = Vec::new();

        for _ in 0..8 {
            tasks.push(tokio::spawn(with_request_scope(new_scope(), async {
                let execution = ExecutionHandle::new(ExecutionInfo::root());
                let scope = current_scope().unwrap();
                scope.enter_context(Some(execution.clone()));

                tokio::task::yield_now().await;

                let seen = current_scope().unwrap().context_execution().unwrap();
                seen.is_same_handle(&execution)
            })));
        }

        for task in tasks {
            assert!(task.await.unwrap());
        }
    }
}
