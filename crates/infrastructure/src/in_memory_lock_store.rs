use async_trait::async_trait;
use chrono::Utc;
use ondemand_application::LockStore;
use ondemand_core::AppResult;
use ondemand_domain::{AcquireOutcome, ExecutionReference, LockRecord};
use tokio::sync::Mutex;

/// In-process lock store for tests and single-node development.
#[derive(Default)]
pub struct InMemoryLockStore {
    record: Mutex<Option<LockRecord>>,
}

impl InMemoryLockStore {
    /// Creates an empty lock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn read(&self) -> AppResult<Option<LockRecord>> {
        Ok(self.record.lock().await.clone())
    }

    async fn conditional_acquire(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<AcquireOutcome> {
        let mut record = self.record.lock().await;
        if !LockRecord::can_acquire(record.as_ref()) {
            return Ok(AcquireOutcome::AlreadyActive);
        }

        *record = Some(LockRecord::acquired(execution_reference.clone(), Utc::now()));
        Ok(AcquireOutcome::Acquired)
    }

    async fn release(&self) -> AppResult<()> {
        *self.record.lock().await = Some(LockRecord::released(Utc::now()));
        Ok(())
    }
}
