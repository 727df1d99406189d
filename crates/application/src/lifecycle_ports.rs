mod lock_store;
mod workflow_engine;

pub use lock_store::LockStore;
pub use workflow_engine::WorkflowEngine;
