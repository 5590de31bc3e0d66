//! Interceptor chain wrapped around every engine execution step.

use crate::execution::ExecutionHandle;
use crate::scope::ScopeManager;
use anyhow::anyhow;
use std::sync::Arc;

/// Describes one engine execution step as seen by interceptors.
#[derive(Debug, Clone)]
pub struct StepContext {
    scope: Arc<ScopeManager>,
    execution: Option<ExecutionHandle>,
    depth: usize,
}

impl StepContext {
    /// Creates a step context at the given nesting depth (0 = outermost).
    #[must_use]
    pub fn new(scope: Arc<ScopeManager>, depth: usize) -> Self {
        Self {
            scope,
            execution: None,
            depth,
        }
    }

    /// Sets the execution the step runs for.
    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionHandle) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Returns the scope manager of the request running this step.
    #[must_use]
    pub fn scope(&self) -> &Arc<ScopeManager> {
        &self.scope
    }

    /// Returns the execution passed into this step, if any.
    #[must_use]
    pub fn execution(&self) -> Option<&ExecutionHandle> {
        self.execution.as_ref()
    }

    /// Returns the nesting depth of this step.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns true if this is the outermost step of the call chain.
    #[must_use]
    pub fn is_outermost(&self) -> bool {
        self.depth == 0
    }
}

/// Trait for execution step interceptors.
pub trait ExecutionInterceptor: Send + Sync {
    /// Returns the interceptor's priority (lower = earlier, i.e. further out).
    fn priority(&self) -> i32 {
        0
    }

    /// Wraps one execution step.
    ///
    /// Implementations call [`ExecutionChain::perform_execution`] to run the
    /// rest of the chain and must return its error unchanged.
    fn intercept_execution(
        &self,
        chain: ExecutionChain<'_>,
        step: &StepContext,
    ) -> anyhow::Result<()>;
}

type StepFn<'a> = dyn FnMut(&StepContext) -> anyhow::Result<()> + 'a;

/// The remainder of an interceptor chain, ending in the step itself.
pub struct ExecutionChain<'a> {
    remaining: &'a [Arc<dyn ExecutionInterceptor>],
    step: &'a mut StepFn<'a>,
}

impl ExecutionChain<'_> {
    /// Runs the next interceptor, or the step once all interceptors ran.
    pub fn perform_execution(self, step: &StepContext) -> anyhow::Result<()> {
        let Self { remaining, step: run } = self;

        match remaining.split_first() {
            Some((next, rest)) => next.intercept_execution(
                ExecutionChain {
                    remaining: rest,
                    step: run,
                },
                step,
            ),
            None => run(step),
        }
    }

    /// Returns the number of interceptors still to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

/// An ordered chain of execution interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn ExecutionInterceptor>>,
}

impl InterceptorChain {
    /// Creates a new empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Adds an interceptor to the chain.
    ///
    /// Interceptors with equal priority keep their insertion order.
    pub fn add(&mut self, interceptor: Arc<dyn ExecutionInterceptor>) {
        self.interceptors.push(interceptor);
        self.interceptors.sort_by_key(|i| i.priority());
    }

    /// Adds an interceptor, builder style.
    #[must_use]
    pub fn with(mut self, interceptor: Arc<dyn ExecutionInterceptor>) -> Self {
        self.add(interceptor);
        self
    }

    /// Runs `body` as an execution step wrapped by every interceptor.
    ///
    /// Errors from `body` are returned unchanged.
    pub fn execute<T, F>(&self, step: &StepContext, body: F) -> anyhow::Result<T>
    where
        F: FnOnce(&StepContext) -> anyhow::Result<T>,
    {
        let mut body = Some(body);
        let mut output = None;

        let mut run = |ctx: &StepContext| -> anyhow::Result<()> {
            let body = body
                .take()
                .ok_or_else(|| anyhow!("Execution step performed more than once"))?;
            output = Some(body(ctx)?);
            Ok(())
        };

        ExecutionChain {
            remaining: &self.interceptors,
            step: &mut run,
        }
        .perform_execution(step)?;

        output.ok_or_else(|| anyhow!("Interceptor returned without performing the execution step"))
    }

    /// Returns the number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Returns the interceptor priorities in execution order.
    #[must_use]
    pub fn priorities(&self) -> Vec<i32> {
        self.interceptors.iter().map(|i| i.priority()).collect()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("priorities", &self.priorities())
            .finish()
    }
}
