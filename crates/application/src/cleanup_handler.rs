use std::sync::Arc;
use std::time::Duration;

use ondemand_domain::ExecutionReference;
use tracing::{error, info, warn};

use crate::lifecycle_ports::LockStore;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Result of one cleanup invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The lock was released.
    Released {
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed; the lock may still be held.
    Failed {
        /// Attempts used.
        attempts: u32,
        /// Error from the last attempt.
        last_error: String,
    },
}

impl CleanupOutcome {
    /// Returns true when the lock was released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released { .. })
    }
}

/// Releases the lock after a failed workload step.
///
/// The release is unconditional: it does not check which run holds the
/// lock, so a late cleanup can clear a lock taken by a newer run.
#[derive(Clone)]
pub struct CleanupHandler {
    lock_store: Arc<dyn LockStore>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl CleanupHandler {
    /// Creates a cleanup handler with the default retry policy.
    #[must_use]
    pub fn new(lock_store: Arc<dyn LockStore>) -> Self {
        Self {
            lock_store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Overrides the retry policy. Backoff grows linearly per attempt.
    #[must_use]
    pub fn with_retry_policy(mut self, max_attempts: u32, retry_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = retry_backoff;
        self
    }

    /// Releases the lock, retrying store failures. Never returns an error.
    pub async fn run_cleanup(&self, execution_reference: &ExecutionReference) -> CleanupOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.lock_store.release().await {
                Ok(()) => {
                    info!(
                        execution_reference = %execution_reference,
                        attempt,
                        "cleanup released lifecycle lock"
                    );
                    return CleanupOutcome::Released { attempts: attempt };
                }
                Err(release_error) => {
                    warn!(
                        execution_reference = %execution_reference,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %release_error,
                        "cleanup release attempt failed"
                    );
                    last_error = release_error.to_string();
                }
            }

            if attempt < self.max_attempts && !self.retry_backoff.is_zero() {
                tokio::time::sleep(self.retry_backoff * attempt).await;
            }
        }

        error!(
            execution_reference = %execution_reference,
            attempts = self.max_attempts,
            error = %last_error,
            "cleanup gave up; lifecycle lock may remain held"
        );

        CleanupOutcome::Failed {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
