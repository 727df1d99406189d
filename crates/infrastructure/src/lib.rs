//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_compute_platform;
mod http_naming_service;
mod in_memory_lock_store;
mod in_memory_naming_service;
mod in_memory_workflow_engine;
mod postgres_lock_store;
mod postgres_workflow_engine;
mod redis_lock_store;

pub use http_compute_platform::HttpComputePlatform;
pub use http_naming_service::HttpNamingService;
pub use in_memory_lock_store::InMemoryLockStore;
pub use in_memory_naming_service::InMemoryNamingService;
pub use in_memory_workflow_engine::InMemoryWorkflowEngine;
pub use postgres_lock_store::PostgresLockStore;
pub use postgres_workflow_engine::PostgresWorkflowEngine;
pub use redis_lock_store::RedisLockStore;
