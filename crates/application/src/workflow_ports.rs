mod execution;
mod repository;

pub use execution::{ClaimedWorkflowRun, CompleteWorkflowRunInput, WorkflowRun};
pub use repository::WorkflowRunRepository;
