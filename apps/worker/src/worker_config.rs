use std::collections::BTreeMap;
use std::env;

use ondemand_core::{AppError, AppResult};
use ondemand_domain::{WorkloadSpec, WorkloadSpecInput};

/// Backend holding the singleton lifecycle lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStoreBackend {
    Postgres,
    Redis,
}

impl LockStoreBackend {
    fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::Validation(format!(
                "LOCK_STORE_BACKEND must be either 'postgres' or 'redis', got '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Redis => "redis",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub worker_id: String,
    pub claim_limit: usize,
    pub lease_seconds: u32,
    pub poll_interval_ms: u64,
    pub workload_poll_interval_ms: u64,
    /// Zero disables the run duration limit.
    pub max_run_seconds: u64,
    pub ownership_grace_seconds: u64,
    pub cleanup_max_attempts: u32,
    pub cleanup_retry_backoff_ms: u64,
    pub lock_store_backend: LockStoreBackend,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub compute_api_base_url: String,
    pub compute_api_token: Option<String>,
    pub http_timeout_seconds: u64,
    pub workload: WorkloadSpec,
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let worker_id = optional_non_empty_env("WORKER_ID")
            .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));
        let claim_limit = parse_env_usize("WORKER_CLAIM_LIMIT", 1)?;
        let lease_seconds = parse_env_u32("WORKER_LEASE_SECONDS", 60)?;
        let poll_interval_ms = parse_env_u64("WORKER_POLL_INTERVAL_MS", 2000)?;
        let workload_poll_interval_ms = parse_env_u64("WORKLOAD_POLL_INTERVAL_MS", 10_000)?;

        if claim_limit == 0 {
            return Err(AppError::Validation(
                "WORKER_CLAIM_LIMIT must be greater than zero".to_owned(),
            ));
        }

        if lease_seconds == 0 {
            return Err(AppError::Validation(
                "WORKER_LEASE_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "WORKER_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        // Each supervision poll renews the lease.
        if workload_poll_interval_ms == 0
            || workload_poll_interval_ms >= u64::from(lease_seconds) * 1000
        {
            return Err(AppError::Validation(
                "WORKLOAD_POLL_INTERVAL_MS must be greater than zero and shorter than WORKER_LEASE_SECONDS"
                    .to_owned(),
            ));
        }

        let ownership_grace_seconds = parse_env_u64("WORKFLOW_OWNERSHIP_GRACE_SECONDS", 10)?;
        validate_ownership_grace(ownership_grace_seconds, lease_seconds)?;

        let lock_store_backend = LockStoreBackend::parse(
            env::var("LOCK_STORE_BACKEND")
                .unwrap_or_else(|_| "postgres".to_owned())
                .as_str(),
        )?;
        let redis_url = optional_non_empty_env("REDIS_URL");
        if lock_store_backend == LockStoreBackend::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when LOCK_STORE_BACKEND=redis".to_owned(),
            ));
        }

        let workload = WorkloadSpec::new(WorkloadSpecInput {
            cluster_id: required_env("WORKLOAD_CLUSTER_ID")?,
            task_definition: required_env("WORKLOAD_TASK_DEFINITION")?,
            container_name: required_env("WORKLOAD_CONTAINER_NAME")?,
            subnets: parse_list(env::var("WORKLOAD_SUBNETS").unwrap_or_default().as_str()),
            security_groups: parse_list(
                env::var("WORKLOAD_SECURITY_GROUPS")
                    .unwrap_or_default()
                    .as_str(),
            ),
            assign_public_ip: parse_env_bool("WORKLOAD_ASSIGN_PUBLIC_IP", true)?,
            environment: parse_environment(
                env::var("WORKLOAD_ENVIRONMENT").unwrap_or_default().as_str(),
            )?,
        })?;

        Ok(Self {
            database_url,
            worker_id,
            claim_limit,
            lease_seconds,
            poll_interval_ms,
            workload_poll_interval_ms,
            max_run_seconds: parse_env_u64("WORKLOAD_MAX_RUN_SECONDS", 0)?,
            ownership_grace_seconds,
            cleanup_max_attempts: parse_env_u32("CLEANUP_MAX_ATTEMPTS", 3)?,
            cleanup_retry_backoff_ms: parse_env_u64("CLEANUP_RETRY_BACKOFF_MS", 500)?,
            lock_store_backend,
            redis_url,
            redis_key_prefix: optional_non_empty_env("REDIS_KEY_PREFIX")
                .unwrap_or_else(|| "ondemand".to_owned()),
            compute_api_base_url: required_env("COMPUTE_API_BASE_URL")?,
            compute_api_token: optional_non_empty_env("COMPUTE_API_TOKEN"),
            http_timeout_seconds: parse_env_u64("HTTP_TIMEOUT_SECONDS", 15)?,
            workload,
        })
    }
}

/// The lease is not renewed while a fresh run waits for lock ownership.
fn validate_ownership_grace(grace_seconds: u64, lease_seconds: u32) -> AppResult<()> {
    if grace_seconds >= u64::from(lease_seconds) {
        return Err(AppError::Validation(
            "WORKFLOW_OWNERSHIP_GRACE_SECONDS must be shorter than WORKER_LEASE_SECONDS"
                .to_owned(),
        ));
    }

    Ok(())
}

/// Splits a comma-separated list, dropping blank entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Parses `KEY=VALUE,KEY=VALUE`. Values may contain `=` but not `,`.
fn parse_environment(value: &str) -> AppResult<BTreeMap<String, String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                AppError::Validation(format!(
                    "invalid WORKLOAD_ENVIRONMENT entry '{pair}': expected KEY=VALUE"
                ))
            })?;
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        })
        .collect()
}

fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "invalid {name} value '{value}': expected true or false"
        ))),
    }
}

fn required_env(name: &str) -> AppResult<String> {
    let value =
        env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(name, value.as_str()),
        Err(_) => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
