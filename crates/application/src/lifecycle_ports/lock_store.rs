use async_trait::async_trait;
use ondemand_core::AppResult;
use ondemand_domain::{AcquireOutcome, ExecutionReference, LockRecord};

/// Strongly-consistent store for the singleton lock record.
///
/// Implementations must make `conditional_acquire` a single atomic
/// compare-and-set; it is the only mutual-exclusion gate for starts.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Returns the current record, or none when it was never written.
    async fn read(&self) -> AppResult<Option<LockRecord>>;

    /// Marks the record held by `execution_reference` only when it is absent
    /// or released; otherwise leaves it untouched.
    async fn conditional_acquire(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<AcquireOutcome>;

    /// Unconditionally releases the record. Releasing twice is not an error.
    async fn release(&self) -> AppResult<()>;
}
