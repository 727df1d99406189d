use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{
    AcquireOutcome, ExecutionReference, LockRecord, TaskHandle, TaskStatus, WorkflowStep,
    WorkloadSpec, WorkloadSpecInput,
};
use tokio::sync::Mutex;

use crate::lifecycle_ports::{LockStore, WorkflowEngine};
use crate::platform_ports::ComputePlatform;
use crate::workflow_ports::{
    ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowRun, WorkflowRunRepository,
};

pub(crate) fn reference(value: &str) -> ExecutionReference {
    ExecutionReference::new(value).unwrap_or_else(|error| panic!("invalid reference: {error}"))
}

pub(crate) fn task(task_id: &str) -> TaskHandle {
    TaskHandle::new("minecraft", task_id).unwrap_or_else(|error| panic!("invalid task: {error}"))
}

pub(crate) fn workload_spec() -> WorkloadSpec {
    WorkloadSpec::new(WorkloadSpecInput {
        cluster_id: "minecraft".to_owned(),
        task_definition: "minecraft-server".to_owned(),
        container_name: "minecraft-server".to_owned(),
        subnets: vec!["subnet-a".to_owned()],
        security_groups: vec!["sg-1".to_owned()],
        assign_public_ip: true,
        environment: BTreeMap::from([("WORLD".to_owned(), "survival".to_owned())]),
    })
    .unwrap_or_else(|error| panic!("invalid workload spec: {error}"))
}

pub(crate) fn claimed_run(execution_reference: &str) -> ClaimedWorkflowRun {
    ClaimedWorkflowRun {
        execution_reference: reference(execution_reference),
        lease_token: "lease-1".to_owned(),
        task: None,
        stop_requested: false,
        started_at: Utc::now(),
    }
}

#[derive(Default)]
pub(crate) struct FakeLockStore {
    record: Mutex<Option<LockRecord>>,
    remaining_release_failures: Mutex<u32>,
    release_calls: Mutex<u32>,
    unavailable: Mutex<bool>,
}

impl FakeLockStore {
    pub(crate) fn held_by(execution_reference: &str) -> Self {
        Self {
            record: Mutex::new(Some(LockRecord::acquired(
                reference(execution_reference),
                Utc::now(),
            ))),
            ..Self::default()
        }
    }

    pub(crate) async fn fail_next_releases(&self, count: u32) {
        *self.remaining_release_failures.lock().await = count;
    }

    pub(crate) async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().await = unavailable;
    }

    pub(crate) async fn release_calls(&self) -> u32 {
        *self.release_calls.lock().await
    }

    pub(crate) async fn current(&self) -> Option<LockRecord> {
        self.record.lock().await.clone()
    }

    async fn ensure_available(&self) -> AppResult<()> {
        if *self.unavailable.lock().await {
            return Err(AppError::StoreUnavailable("lock store offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for FakeLockStore {
    async fn read(&self) -> AppResult<Option<LockRecord>> {
        self.ensure_available().await?;
        Ok(self.record.lock().await.clone())
    }

    async fn conditional_acquire(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<AcquireOutcome> {
        self.ensure_available().await?;
        let mut record = self.record.lock().await;
        if !LockRecord::can_acquire(record.as_ref()) {
            return Ok(AcquireOutcome::AlreadyActive);
        }
        *record = Some(LockRecord::acquired(execution_reference.clone(), Utc::now()));
        Ok(AcquireOutcome::Acquired)
    }

    async fn release(&self) -> AppResult<()> {
        *self.release_calls.lock().await += 1;
        self.ensure_available().await?;

        let mut remaining_failures = self.remaining_release_failures.lock().await;
        if *remaining_failures > 0 {
            *remaining_failures -= 1;
            return Err(AppError::StoreUnavailable("release unavailable".to_owned()));
        }

        *self.record.lock().await = Some(LockRecord::released(Utc::now()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeWorkflowEngine {
    started: Mutex<Vec<ExecutionReference>>,
    stopped: Mutex<Vec<ExecutionReference>>,
    fail_start: Mutex<bool>,
    fail_stop: Mutex<bool>,
}

impl FakeWorkflowEngine {
    pub(crate) async fn set_fail_start(&self, fail: bool) {
        *self.fail_start.lock().await = fail;
    }

    pub(crate) async fn set_fail_stop(&self, fail: bool) {
        *self.fail_stop.lock().await = fail;
    }

    pub(crate) async fn started(&self) -> Vec<ExecutionReference> {
        self.started.lock().await.clone()
    }

    pub(crate) async fn stopped(&self) -> Vec<ExecutionReference> {
        self.stopped.lock().await.clone()
    }
}

#[async_trait]
impl WorkflowEngine for FakeWorkflowEngine {
    async fn start_run(&self) -> AppResult<ExecutionReference> {
        if *self.fail_start.lock().await {
            return Err(AppError::WorkflowSubmissionFailed(
                "engine rejected submission".to_owned(),
            ));
        }

        let mut started = self.started.lock().await;
        let execution_reference = reference(&format!("run-{}", started.len() + 1));
        started.push(execution_reference.clone());
        Ok(execution_reference)
    }

    async fn stop_run(&self, execution_reference: &ExecutionReference) -> AppResult<()> {
        if *self.fail_stop.lock().await {
            return Err(AppError::WorkflowTerminationFailed(
                "engine rejected termination".to_owned(),
            ));
        }

        self.stopped.lock().await.push(execution_reference.clone());
        Ok(())
    }
}

pub(crate) struct FakeRunRepository {
    steps: Mutex<Vec<WorkflowStep>>,
    tasks: Mutex<Vec<TaskHandle>>,
    completions: Mutex<Vec<CompleteWorkflowRunInput>>,
    stop_requested: Mutex<bool>,
    lease_valid: Mutex<bool>,
    pending: Mutex<Vec<ClaimedWorkflowRun>>,
}

impl Default for FakeRunRepository {
    fn default() -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            stop_requested: Mutex::new(false),
            lease_valid: Mutex::new(true),
            pending: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRunRepository {
    pub(crate) async fn enqueue(&self, run: ClaimedWorkflowRun) {
        self.pending.lock().await.push(run);
    }

    pub(crate) async fn request_stop(&self) {
        *self.stop_requested.lock().await = true;
    }

    pub(crate) async fn revoke_lease(&self) {
        *self.lease_valid.lock().await = false;
    }

    pub(crate) async fn steps(&self) -> Vec<WorkflowStep> {
        self.steps.lock().await.clone()
    }

    pub(crate) async fn tasks(&self) -> Vec<TaskHandle> {
        self.tasks.lock().await.clone()
    }

    pub(crate) async fn completions(&self) -> Vec<CompleteWorkflowRunInput> {
        self.completions.lock().await.clone()
    }
}

#[async_trait]
impl WorkflowRunRepository for FakeRunRepository {
    async fn claim_runs(
        &self,
        _worker_id: &str,
        limit: usize,
        _lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedWorkflowRun>> {
        let mut pending = self.pending.lock().await;
        let take = limit.min(pending.len());
        Ok(pending.drain(..take).collect())
    }

    async fn renew_lease(&self, _run: &ClaimedWorkflowRun, _lease_seconds: u32) -> AppResult<bool> {
        Ok(*self.lease_valid.lock().await)
    }

    async fn record_step(&self, _run: &ClaimedWorkflowRun, step: WorkflowStep) -> AppResult<()> {
        self.steps.lock().await.push(step);
        Ok(())
    }

    async fn record_task(&self, _run: &ClaimedWorkflowRun, task: &TaskHandle) -> AppResult<()> {
        self.tasks.lock().await.push(task.clone());
        Ok(())
    }

    async fn is_stop_requested(
        &self,
        _execution_reference: &ExecutionReference,
    ) -> AppResult<bool> {
        Ok(*self.stop_requested.lock().await)
    }

    async fn complete_run(&self, input: CompleteWorkflowRunInput) -> AppResult<WorkflowRun> {
        self.completions.lock().await.push(input.clone());
        let steps = self.steps.lock().await;
        let tasks = self.tasks.lock().await;

        Ok(WorkflowRun {
            execution_reference: input.execution_reference,
            state: input.state,
            current_step: steps.last().copied(),
            task: tasks.last().cloned(),
            failure_reason: input.failure_reason,
            created_at: Utc::now(),
            finished_at: Some(Utc::now()),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeComputePlatform {
    launch_error: Mutex<Option<String>>,
    statuses: Mutex<VecDeque<AppResult<TaskStatus>>>,
    launches: Mutex<u32>,
    stopped: Mutex<Vec<(TaskHandle, String)>>,
}

impl FakeComputePlatform {
    pub(crate) async fn fail_launch(&self, message: &str) {
        *self.launch_error.lock().await = Some(message.to_owned());
    }

    /// Queues status responses. Once drained the task reports running.
    pub(crate) async fn push_status(&self, status: AppResult<TaskStatus>) {
        self.statuses.lock().await.push_back(status);
    }

    pub(crate) async fn launches(&self) -> u32 {
        *self.launches.lock().await
    }

    pub(crate) async fn stopped(&self) -> Vec<(TaskHandle, String)> {
        self.stopped.lock().await.clone()
    }
}

#[async_trait]
impl ComputePlatform for FakeComputePlatform {
    async fn launch_task(&self, _spec: &WorkloadSpec) -> AppResult<TaskHandle> {
        if let Some(message) = self.launch_error.lock().await.clone() {
            return Err(AppError::Internal(message));
        }

        let mut launches = self.launches.lock().await;
        *launches += 1;
        Ok(task(&format!("task-{launches}")))
    }

    async fn task_status(&self, _task: &TaskHandle) -> AppResult<TaskStatus> {
        self.statuses
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(TaskStatus::Running))
    }

    async fn stop_task(&self, task: &TaskHandle, reason: &str) -> AppResult<()> {
        self.stopped
            .lock()
            .await
            .push((task.clone(), reason.to_owned()));
        Ok(())
    }
}
