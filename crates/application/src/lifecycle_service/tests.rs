use std::sync::Arc;

use ondemand_core::AppError;
use ondemand_domain::ServerStatus;

use crate::test_support::{FakeLockStore, FakeWorkflowEngine, reference};

use super::{LifecycleService, StartServerOutcome};

fn build_service(
    lock_store: Arc<FakeLockStore>,
    workflow_engine: Arc<FakeWorkflowEngine>,
) -> LifecycleService {
    LifecycleService::new(lock_store, workflow_engine)
}

#[tokio::test]
async fn start_acquires_free_lock() {
    let lock_store = Arc::new(FakeLockStore::default());
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store.clone(), workflow_engine.clone());

    let outcome = service
        .start_server()
        .await
        .unwrap_or_else(|error| panic!("start should succeed: {error}"));

    assert_eq!(
        outcome,
        StartServerOutcome::Starting {
            execution_reference: reference("run-1"),
        }
    );
    assert_eq!(outcome.server_status(), ServerStatus::Starting);
    assert!(
        lock_store
            .current()
            .await
            .is_some_and(|record| record.is_held_by(&reference("run-1")))
    );
}

#[tokio::test]
async fn start_while_active_keeps_existing_holder() {
    let lock_store = Arc::new(FakeLockStore::held_by("run-0"));
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store.clone(), workflow_engine.clone());

    let outcome = service
        .start_server()
        .await
        .unwrap_or_else(|error| panic!("start should succeed: {error}"));

    assert_eq!(
        outcome,
        StartServerOutcome::AlreadyActive {
            submitted_reference: reference("run-1"),
            active_reference: Some(reference("run-0")),
        }
    );
    assert_eq!(outcome.server_status(), ServerStatus::Online);
    assert_eq!(workflow_engine.started().await, vec![reference("run-1")]);
    assert!(
        lock_store
            .current()
            .await
            .is_some_and(|record| record.is_held_by(&reference("run-0")))
    );
}

#[tokio::test]
async fn start_reports_submission_failure_without_touching_lock() {
    let lock_store = Arc::new(FakeLockStore::default());
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    workflow_engine.set_fail_start(true).await;
    let service = build_service(lock_store.clone(), workflow_engine);

    let result = service.start_server().await;

    assert!(matches!(result, Err(AppError::WorkflowSubmissionFailed(_))));
    assert!(lock_store.current().await.is_none());
}

#[tokio::test]
async fn start_surfaces_store_outage_after_submission() {
    let lock_store = Arc::new(FakeLockStore::default());
    lock_store.set_unavailable(true).await;
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store, workflow_engine.clone());

    let result = service.start_server().await;

    assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    assert_eq!(workflow_engine.started().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_acquire_exactly_once() {
    let lock_store = Arc::new(FakeLockStore::default());
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store, workflow_engine);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.start_server().await }));
    }

    let mut starting = 0;
    let mut already_active = 0;
    for handle in handles {
        match handle
            .await
            .unwrap_or_else(|error| panic!("task should join: {error}"))
            .unwrap_or_else(|error| panic!("start should succeed: {error}"))
        {
            StartServerOutcome::Starting { .. } => starting += 1,
            StartServerOutcome::AlreadyActive { .. } => already_active += 1,
        }
    }

    assert_eq!(starting, 1);
    assert_eq!(already_active, 15);
}

#[tokio::test]
async fn stop_terminates_active_run_and_releases_lock() {
    let lock_store = Arc::new(FakeLockStore::held_by("run-7"));
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store.clone(), workflow_engine.clone());

    let outcome = service
        .stop_server()
        .await
        .unwrap_or_else(|error| panic!("stop should succeed: {error}"));

    assert_eq!(outcome.execution_reference, reference("run-7"));
    assert_eq!(workflow_engine.stopped().await, vec![reference("run-7")]);
    assert!(
        lock_store
            .current()
            .await
            .is_some_and(|record| !record.in_progress())
    );
}

#[tokio::test]
async fn second_stop_reports_not_running() {
    let lock_store = Arc::new(FakeLockStore::held_by("run-7"));
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store, workflow_engine.clone());

    assert!(service.stop_server().await.is_ok());
    let second = service.stop_server().await;

    assert!(matches!(second, Err(AppError::NotRunning)));
    assert_eq!(workflow_engine.stopped().await.len(), 1);
}

#[tokio::test]
async fn stop_without_record_reports_not_running() {
    let service = build_service(
        Arc::new(FakeLockStore::default()),
        Arc::new(FakeWorkflowEngine::default()),
    );

    assert!(matches!(
        service.stop_server().await,
        Err(AppError::NotRunning)
    ));
}

#[tokio::test]
async fn stop_releases_lock_even_when_termination_fails() {
    let lock_store = Arc::new(FakeLockStore::held_by("run-7"));
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    workflow_engine.set_fail_stop(true).await;
    let service = build_service(lock_store.clone(), workflow_engine);

    let result = service.stop_server().await;

    assert!(matches!(result, Err(AppError::WorkflowTerminationFailed(_))));
    assert_eq!(lock_store.release_calls().await, 1);
    assert!(
        lock_store
            .current()
            .await
            .is_some_and(|record| !record.in_progress())
    );
}

#[tokio::test]
async fn stop_then_start_acquires_again() {
    let lock_store = Arc::new(FakeLockStore::held_by("run-0"));
    let workflow_engine = Arc::new(FakeWorkflowEngine::default());
    let service = build_service(lock_store, workflow_engine);

    assert!(service.stop_server().await.is_ok());
    let outcome = service
        .start_server()
        .await
        .unwrap_or_else(|error| panic!("start should succeed: {error}"));

    assert_eq!(outcome.server_status(), ServerStatus::Starting);
}

#[tokio::test]
async fn status_reflects_lock_record() {
    let lock_store = Arc::new(FakeLockStore::default());
    let service = build_service(lock_store, Arc::new(FakeWorkflowEngine::default()));

    let offline = service
        .server_status()
        .await
        .unwrap_or_else(|error| panic!("status should succeed: {error}"));
    assert_eq!(offline.status, ServerStatus::Offline);
    assert!(offline.updated_at.is_none());

    assert!(service.start_server().await.is_ok());
    let online = service
        .server_status()
        .await
        .unwrap_or_else(|error| panic!("status should succeed: {error}"));
    assert_eq!(online.status, ServerStatus::Online);
    assert_eq!(online.execution_reference, Some(reference("run-1")));
}
