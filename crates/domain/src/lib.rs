//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod endpoint;
mod execution;
mod lock;
mod server;
mod workload;

pub use endpoint::{DEFAULT_DNS_RECORD_TTL_SECONDS, DnsRecord, DnsRecordType, WorkloadRunningEvent};
pub use execution::{ExecutionReference, WorkflowRunState, WorkflowStep, WorkloadFailure};
pub use lock::{AcquireOutcome, LOCK_RECORD_ID, LockRecord};
pub use server::ServerStatus;
pub use workload::{TaskHandle, TaskStatus, WorkloadSpec, WorkloadSpecInput};
