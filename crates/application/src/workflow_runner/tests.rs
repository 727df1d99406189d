use std::sync::Arc;
use std::time::Duration;

use ondemand_core::{AppError, AppResult};
use ondemand_domain::{TaskStatus, WorkflowRunState, WorkflowStep};

use crate::cleanup_handler::CleanupHandler;
use crate::lifecycle_ports::LockStore;
use crate::test_support::{
    FakeComputePlatform, FakeLockStore, FakeRunRepository, claimed_run, reference, task,
    workload_spec,
};

use super::{WorkflowRunner, WorkflowRunnerConfig};

struct Harness {
    runner: WorkflowRunner,
    repository: Arc<FakeRunRepository>,
    compute_platform: Arc<FakeComputePlatform>,
    lock_store: Arc<FakeLockStore>,
}

fn config() -> WorkflowRunnerConfig {
    WorkflowRunnerConfig {
        workload: workload_spec(),
        poll_interval: Duration::ZERO,
        lease_seconds: 60,
        max_run_duration: None,
        ownership_grace: Duration::ZERO,
    }
}

fn harness(lock_store: FakeLockStore, config: WorkflowRunnerConfig) -> Harness {
    let repository = Arc::new(FakeRunRepository::default());
    let compute_platform = Arc::new(FakeComputePlatform::default());
    let lock_store = Arc::new(lock_store);
    let cleanup_handler =
        CleanupHandler::new(lock_store.clone()).with_retry_policy(2, Duration::ZERO);

    Harness {
        runner: WorkflowRunner::new(
            repository.clone(),
            compute_platform.clone(),
            lock_store.clone(),
            cleanup_handler,
            config,
        ),
        repository,
        compute_platform,
        lock_store,
    }
}

fn stopped(exit_code: Option<i32>, reason: Option<&str>) -> AppResult<TaskStatus> {
    Ok(TaskStatus::Stopped {
        exit_code,
        reason: reason.map(str::to_owned),
    })
}

async fn assert_lock_released(lock_store: &FakeLockStore) {
    assert!(
        lock_store
            .current()
            .await
            .is_some_and(|record| !record.in_progress()),
        "lock should be released"
    );
}

#[tokio::test]
async fn clean_exit_completes_without_cleanup() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness
        .compute_platform
        .push_status(Ok(TaskStatus::Provisioning))
        .await;
    harness
        .compute_platform
        .push_status(Ok(TaskStatus::Running))
        .await;
    harness
        .compute_platform
        .push_status(stopped(Some(0), None))
        .await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert!(run.failure_reason.is_none());
    assert_eq!(harness.repository.steps().await, vec![WorkflowStep::RunWorkload]);
    assert_eq!(harness.repository.tasks().await, vec![task("task-1")]);
    assert_eq!(harness.lock_store.release_calls().await, 0);
}

#[tokio::test]
async fn timeout_routes_to_cleanup_and_releases_lock() {
    let mut config = config();
    config.max_run_duration = Some(Duration::ZERO);
    let harness = harness(FakeLockStore::held_by("run-1"), config);

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert_eq!(
        run.failure_reason.as_deref(),
        Some("workload timed out after 0s")
    );
    assert_eq!(
        harness.repository.steps().await,
        vec![WorkflowStep::RunWorkload, WorkflowStep::Cleanup]
    );
    assert_eq!(
        harness.compute_platform.stopped().await,
        vec![(task("task-1"), "maximum run duration exceeded".to_owned())]
    );
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn platform_status_error_routes_to_cleanup() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness
        .compute_platform
        .push_status(Err(AppError::Internal("describe timed out".to_owned())))
        .await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert!(
        run.failure_reason
            .as_deref()
            .is_some_and(|reason| reason.starts_with("compute platform error"))
    );
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn launch_failure_routes_to_cleanup() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness.compute_platform.fail_launch("capacity unavailable").await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert!(harness.repository.tasks().await.is_empty());
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn non_zero_exit_routes_to_cleanup() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness
        .compute_platform
        .push_status(stopped(Some(137), Some("OutOfMemoryError")))
        .await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(
        run.failure_reason.as_deref(),
        Some("workload exited with code 137 (OutOfMemoryError)")
    );
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn stop_request_terminates_task_and_runs_cleanup() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness.repository.request_stop().await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(
        run.failure_reason.as_deref(),
        Some("workload terminated by stop request")
    );
    assert_eq!(
        harness.compute_platform.stopped().await,
        vec![(task("task-1"), "stop requested".to_owned())]
    );
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn run_stopped_before_claim_never_launches() {
    let harness = harness(FakeLockStore::default(), config());
    let mut claimed = claimed_run("run-1");
    claimed.stop_requested = true;

    let run = harness
        .runner
        .execute_claimed_run(claimed)
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert_eq!(harness.compute_platform.launches().await, 0);
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn duplicate_run_finishes_without_launch_or_cleanup() {
    let harness = harness(FakeLockStore::held_by("run-0"), config());

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert_eq!(
        run.failure_reason.as_deref(),
        Some("superseded by active run 'run-0'")
    );
    assert_eq!(harness.compute_platform.launches().await, 0);
    assert_eq!(harness.lock_store.release_calls().await, 0);
    assert!(
        harness
            .lock_store
            .current()
            .await
            .is_some_and(|record| record.in_progress())
    );
}

#[tokio::test]
async fn run_waits_out_grace_when_previous_run_is_stopped_meanwhile() {
    let harness = harness(
        FakeLockStore::held_by("run-0"),
        WorkflowRunnerConfig {
            ownership_grace: Duration::from_millis(400),
            ..config()
        },
    );
    harness
        .compute_platform
        .push_status(stopped(Some(0), None))
        .await;

    let lock_store = harness.lock_store.clone();
    let start_request = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        lock_store
            .release()
            .await
            .unwrap_or_else(|error| panic!("release should succeed: {error}"));
        lock_store
            .conditional_acquire(&reference("run-1"))
            .await
            .unwrap_or_else(|error| panic!("acquire should succeed: {error}"))
    });

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));
    start_request
        .await
        .unwrap_or_else(|error| panic!("start request task should finish: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert_eq!(run.failure_reason, None);
    assert_eq!(harness.compute_platform.launches().await, 1);
}

#[tokio::test]
async fn superseded_run_releases_lock_acquired_for_it_late() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());

    harness
        .runner
        .release_if_held_by_superseded(&claimed_run("run-1"))
        .await;

    assert_eq!(harness.lock_store.release_calls().await, 1);
    assert_lock_released(&harness.lock_store).await;
}

#[tokio::test]
async fn superseded_run_leaves_lock_of_active_run_alone() {
    let harness = harness(FakeLockStore::held_by("run-0"), config());

    harness
        .runner
        .release_if_held_by_superseded(&claimed_run("run-1"))
        .await;

    assert_eq!(harness.lock_store.release_calls().await, 0);
}

#[tokio::test]
async fn unconfirmed_ownership_still_launches() {
    let harness = harness(FakeLockStore::default(), config());
    harness.lock_store.set_unavailable(true).await;
    harness
        .compute_platform
        .push_status(stopped(Some(0), None))
        .await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert_eq!(harness.compute_platform.launches().await, 1);
}

#[tokio::test]
async fn recovered_run_resumes_supervision_without_relaunch() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness
        .compute_platform
        .push_status(stopped(Some(0), None))
        .await;
    let mut claimed = claimed_run("run-1");
    claimed.task = Some(task("task-9"));

    let run = harness
        .runner
        .execute_claimed_run(claimed)
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Succeeded);
    assert_eq!(harness.compute_platform.launches().await, 0);
}

#[tokio::test]
async fn lost_lease_abandons_run_without_completion() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness.repository.revoke_lease().await;

    let result = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(harness.repository.completions().await.is_empty());
    assert_eq!(harness.lock_store.release_calls().await, 0);
}

#[tokio::test]
async fn failed_cleanup_marks_run_failed() {
    let harness = harness(FakeLockStore::held_by("run-1"), config());
    harness.compute_platform.fail_launch("no capacity").await;
    harness.lock_store.fail_next_releases(10).await;

    let run = harness
        .runner
        .execute_claimed_run(claimed_run("run-1"))
        .await
        .unwrap_or_else(|error| panic!("run should complete: {error}"));

    assert_eq!(run.state, WorkflowRunState::Failed);
    assert!(
        run.failure_reason
            .as_deref()
            .is_some_and(|reason| reason.contains("cleanup failed after 2 attempt(s)"))
    );
    assert_eq!(harness.lock_store.release_calls().await, 2);
}

#[tokio::test]
async fn claim_rejects_blank_worker_and_skips_zero_limit() {
    let harness = harness(FakeLockStore::default(), config());
    harness.repository.enqueue(claimed_run("run-1")).await;

    assert!(matches!(
        harness.runner.claim_runs(" ", 1).await,
        Err(AppError::Validation(_))
    ));
    assert!(
        harness
            .runner
            .claim_runs("worker-a", 0)
            .await
            .is_ok_and(|runs| runs.is_empty())
    );

    let claimed = harness
        .runner
        .claim_runs("worker-a", 5)
        .await
        .unwrap_or_else(|error| panic!("claim should succeed: {error}"));
    assert_eq!(claimed.len(), 1);
}
