//! Redis-backed lifecycle lock store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ondemand_application::LockStore;
use ondemand_core::{AppError, AppResult};
use ondemand_domain::{AcquireOutcome, ExecutionReference, LOCK_RECORD_ID, LockRecord};
use redis::{AsyncCommands, Script};

const ACQUIRE_SCRIPT: &str = r#"
if redis.call('HGET', KEYS[1], 'in_progress') == '1' then
  return 0
end
redis.call('HSET', KEYS[1], 'in_progress', '1', 'execution_reference', ARGV[1], 'updated_at', ARGV[2])
return 1
"#;

const RELEASE_SCRIPT: &str = r#"
redis.call('HSET', KEYS[1], 'in_progress', '0', 'updated_at', ARGV[1])
redis.call('HDEL', KEYS[1], 'execution_reference')
return 1
"#;

/// Redis implementation of the lock store port.
///
/// The record is one hash; acquire and release run as Lua scripts so each is
/// applied atomically on the server.
#[derive(Clone)]
pub struct RedisLockStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisLockStore {
    /// Creates a lock store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn record_key(&self) -> String {
        format!("{}:lock:{LOCK_RECORD_ID}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!("failed to connect to redis: {error}"))
            })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn read(&self) -> AppResult<Option<LockRecord>> {
        let mut connection = self.connection().await?;
        let fields: HashMap<String, String> = connection
            .hgetall(self.record_key())
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!("failed to read lifecycle lock: {error}"))
            })?;

        lock_record_from_fields(&fields)
    }

    async fn conditional_acquire(
        &self,
        execution_reference: &ExecutionReference,
    ) -> AppResult<AcquireOutcome> {
        let mut connection = self.connection().await?;
        let acquired: i32 = Script::new(ACQUIRE_SCRIPT)
            .key(self.record_key())
            .arg(execution_reference.as_str())
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!(
                    "failed to acquire lifecycle lock for run '{execution_reference}': {error}"
                ))
            })?;

        Ok(if acquired == 1 {
            AcquireOutcome::Acquired
        } else {
            AcquireOutcome::AlreadyActive
        })
    }

    async fn release(&self) -> AppResult<()> {
        let mut connection = self.connection().await?;
        Script::new(RELEASE_SCRIPT)
            .key(self.record_key())
            .arg(Utc::now().timestamp_millis())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!("failed to release lifecycle lock: {error}"))
            })?;

        Ok(())
    }
}

fn lock_record_from_fields(fields: &HashMap<String, String>) -> AppResult<Option<LockRecord>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let in_progress = fields.get("in_progress").map(String::as_str) == Some("1");
    let execution_reference = fields
        .get("execution_reference")
        .cloned()
        .map(ExecutionReference::new)
        .transpose()?;
    let updated_at = fields
        .get("updated_at")
        .map(|value| parse_timestamp_millis(value))
        .transpose()?
        .unwrap_or_else(Utc::now);

    Ok(Some(LockRecord::from_parts(
        in_progress,
        execution_reference,
        updated_at,
    )))
}

fn parse_timestamp_millis(value: &str) -> AppResult<DateTime<Utc>> {
    let millis = value.parse::<i64>().map_err(|error| {
        AppError::Internal(format!("invalid lifecycle lock timestamp '{value}': {error}"))
    })?;

    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        AppError::Internal(format!("lifecycle lock timestamp '{value}' is out of range"))
    })
}
