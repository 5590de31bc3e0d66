//! End-to-end tests: komponent, engine factory, session and handlers together.

use super::*;
use crate::config::KomponentConfig;
use crate::delegate::{
    DelegateExecution, DelegateTask, Job, JobHandler, TaskHandler, TaskHandlerKey,
};
use crate::komponent::Komponent;
use crate::interceptors::StepContext;
use crate::scope::{current_scope, with_request_scope, ScopeManager};
use crate::testing::{
    assert_active_execution, assert_no_active_execution, assert_scope_cleared, assert_variable,
    FailingDelegateTask, InMemoryEngineProvider, InMemoryProcessEngine, RecordingDelegateTask,
    RecordingInterceptor, StubConnection, TestExecution, VerifyingTaskHandler,
};
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const PROCESS_KEY: &str = "main";
const FAILING_TASK: &str = "app::ReserveStock";
const REMINDER_JOB: &str = "order-reminder";

struct ReminderJobHandler;

impl JobHandler for ReminderJobHandler {
    fn job_type(&self) -> &str {
        REMINDER_JOB
    }

    fn execute_job(&self, job: &Job, step: &StepContext) -> anyhow::Result<()> {
        let delegate = step.scope().resolve_scoped::<DelegateExecution>()?;
        delegate.set_variable("reminded", job.data.clone());
        Ok(())
    }
}

struct OrderFixture {
    komponent: Arc<Komponent>,
    engine: Arc<InMemoryProcessEngine>,
    recorder: Arc<RecordingInterceptor>,
    processor: &'static str,
}

fn fixture() -> OrderFixture {
    let komponent = Komponent::new(KomponentConfig::default());

    let processor = komponent.task_factory().register::<RecordingDelegateTask>();
    komponent.task_factory().register_with(
        FAILING_TASK,
        Arc::new(|| -> Arc<dyn DelegateTask> {
            Arc::new(FailingDelegateTask::new("out of stock"))
        }),
    );
    komponent.task_handlers().register(
        TaskHandlerKey::new("verifyRegistration").for_process(PROCESS_KEY),
        Arc::new(|scope: &Arc<ScopeManager>| -> Arc<dyn TaskHandler> {
            Arc::new(VerifyingTaskHandler::new(Arc::clone(scope)))
        }),
    );
    komponent.job_handlers().register(Arc::new(ReminderJobHandler));

    let mut connections = MockConnectionManager::new();
    connections
        .expect_connection()
        .returning(|name| Ok(Arc::new(StubConnection::new(name)) as Arc<dyn Connection>));

    let mut engine = komponent
        .create_process_engine(&InMemoryEngineProvider, Arc::new(connections))
        .unwrap();

    let recorder = Arc::new(RecordingInterceptor::new(2000));
    engine.register_interceptor(recorder.clone());

    OrderFixture {
        komponent: Arc::new(komponent),
        engine: Arc::new(engine),
        recorder,
        processor,
    }
}

impl OrderFixture {
    fn session(&self) -> ExecutionSession {
        self.engine.open_session(self.komponent.open_scope())
    }
}

#[test]
fn test_order_process() {
    let fx = fixture();
    let session = fx.session();
    let scope = Arc::clone(session.scope());

    // Start: the service task runs against the new process instance.
    let process = TestExecution::new()
        .at("start")
        .with_business_key("order-2355")
        .build();
    session
        .execute(Some(process.clone()), |step| {
            let delegate = step.scope().resolve_scoped::<DelegateExecution>()?;
            fx.engine.execute_delegate_task(fx.processor, &delegate)
        })
        .unwrap();

    assert_variable(&process, "processor", &json!(fx.processor));
    assert_no_active_execution(&scope);
    assert_scope_cleared(&scope);

    // Complete the user task.
    let waiting = process.at_activity("enterOrderData");
    session
        .execute(Some(waiting.clone()), |step| {
            let delegate = step.scope().resolve_scoped::<DelegateExecution>()?;
            delegate.execution().set_variables(HashMap::from([
                ("id".to_string(), json!(2355)),
                ("title".to_string(), json!("New product order")),
            ]));
            Ok(())
        })
        .unwrap();

    // Correlate the message; the engine loads the execution again and runs
    // the task handler in a nested step.
    let subscribed = waiting.at_activity("OrderRegistrationReceived");
    session
        .execute(Some(subscribed.clone()), |outer| {
            subscribed.set_variable("confirmed", json!(Utc::now().timestamp()));
            let outer_view = outer.scope().resolve_scoped::<DelegateExecution>()?;

            let reloaded = subscribed.at_activity("verifyRegistration");
            session.execute(Some(reloaded.clone()), |inner| {
                assert_active_execution(inner.scope(), &reloaded);
                fx.engine
                    .handle_user_task(inner, Some(PROCESS_KEY), "verifyRegistration")
            })?;

            assert_active_execution(outer.scope(), &subscribed);
            let again = outer.scope().resolve_scoped::<DelegateExecution>()?;
            assert!(Arc::ptr_eq(&outer_view, &again));
            assert_eq!(outer.scope().scoped_executions().len(), 2);
            Ok(())
        })
        .unwrap();

    assert_variable(&process, "executionVerified", &json!(true));
    assert_variable(
        &process,
        "handler",
        &json!(std::any::type_name::<VerifyingTaskHandler>()),
    );
    assert_variable(&process, "id", &json!(2355));
    assert!(process.has_variable("confirmed"));
    assert_no_active_execution(&scope);
    assert_scope_cleared(&scope);

    let depths: Vec<usize> = fx.recorder.steps().iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![0, 0, 1, 0]);
    assert!(fx.recorder.steps().iter().all(|s| s.succeeded));
    assert!(fx
        .recorder
        .steps()
        .iter()
        .all(|s| s.active_execution_id == Some(process.id())));
}

#[test]
fn test_failing_delegate_task_in_nested_step() {
    let fx = fixture();
    let session = fx.session();
    let process = TestExecution::new().at("start").build();

    session
        .execute(Some(process.clone()), |outer| {
            let reserve = process.at_activity("reserveStock");
            let err = session
                .execute(Some(reserve), |inner| {
                    let delegate = inner.scope().resolve_scoped::<DelegateExecution>()?;
                    fx.engine.execute_delegate_task(FAILING_TASK, &delegate)
                })
                .unwrap_err();

            assert_eq!(err.to_string(), "out of stock");
            assert_active_execution(outer.scope(), &process);
            Ok(())
        })
        .unwrap();

    let outcomes: Vec<(usize, bool)> =
        fx.recorder.steps().iter().map(|s| (s.depth, s.succeeded)).collect();
    assert_eq!(outcomes, vec![(1, false), (0, true)]);
}

#[test]
fn test_unknown_delegate_task_fails_step() {
    let fx = fixture();
    let session = fx.session();
    let process = TestExecution::new().build();

    let err = session
        .execute(Some(process), |step| {
            let delegate = step.scope().resolve_scoped::<DelegateExecution>()?;
            fx.engine.execute_delegate_task("app::Missing", &delegate)
        })
        .unwrap_err();

    assert!(err.to_string().contains("app::Missing"));
    assert_no_active_execution(session.scope());
}

#[test]
fn test_task_handler_outside_process_is_not_found() {
    let fx = fixture();
    let session = fx.session();

    let err = session
        .execute(Some(TestExecution::new().build()), |step| {
            fx.engine.handle_user_task(step, Some("other"), "verifyRegistration")
        })
        .unwrap_err();

    assert!(err.to_string().contains("verifyRegistration"));
}

#[test]
fn test_komponent_job_handlers_run_through_engine() {
    let fx = fixture();
    assert_eq!(fx.engine.job_types(), vec![REMINDER_JOB.to_string()]);

    let session = fx.session();
    let waiting = TestExecution::new().at("enterOrderData").build();
    let job = Job::new(REMINDER_JOB, json!({"after": "P1D"})).with_execution_id(waiting.id());

    fx.engine
        .execute_job(&session, &job, Some(waiting.clone()))
        .unwrap();

    assert_variable(&waiting, "reminded", &json!({"after": "P1D"}));
    assert_no_active_execution(session.scope());
    assert_scope_cleared(session.scope());

    let steps = fx.recorder.steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].active_execution_id, Some(waiting.id()));
    assert!(steps[0].succeeded);
}

#[test]
fn test_unknown_job_type_fails_step() {
    let fx = fixture();
    let session = fx.session();

    let err = fx
        .engine
        .execute_job(&session, &Job::new("timer", json!(null)), None)
        .unwrap_err();

    assert!(err.to_string().contains("timer"));
    assert_eq!(session.depth(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let fx = fixture();

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let komponent = Arc::clone(&fx.komponent);
            let engine = Arc::clone(&fx.engine);

            tokio::spawn(async move {
                with_request_scope(komponent.open_scope(), async move {
                    let scope = current_scope().expect("request scope installed");
                    let session = engine.open_session(scope);
                    let execution = TestExecution::new()
                        .with_business_key(format!("order-{i}"))
                        .build();

                    tokio::task::yield_now().await;

                    session.execute(Some(execution), |step| {
                        let delegate = step.scope().resolve_scoped::<DelegateExecution>()?;
                        Ok(delegate.business_key().map(ToString::to_string))
                    })
                })
                .await
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let business_key = task.await.unwrap().unwrap();
        assert_eq!(business_key, Some(format!("order-{i}")));
    }
}
