use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use ondemand_core::AppError;
use ondemand_domain::DEFAULT_DNS_RECORD_TTL_SECONDS;
use tracing_subscriber::EnvFilter;

/// Backend holding the singleton lifecycle lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStoreBackend {
    Postgres,
    Redis,
}

impl LockStoreBackend {
    pub fn parse(value: &str) -> Result<Self, AppError> {
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
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub lock_store_backend: LockStoreBackend,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub compute_api_base_url: String,
    pub compute_api_token: Option<String>,
    pub naming_api_base_url: String,
    pub naming_api_token: Option<String>,
    pub naming_zone_id: String,
    pub server_domain_name: String,
    pub server_record_ttl_seconds: u32,
    pub event_shared_secret: Option<String>,
    pub cors_allowed_origin: Option<String>,
    pub http_timeout_seconds: u64,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_non_empty_env("DATABASE_URL")?;
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

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
        let redis_key_prefix =
            optional_non_empty_env("REDIS_KEY_PREFIX").unwrap_or_else(|| "ondemand".to_owned());

        let server_record_ttl_seconds =
            parse_env_u32("SERVER_RECORD_TTL_SECONDS", DEFAULT_DNS_RECORD_TTL_SECONDS)?;
        if server_record_ttl_seconds == 0 {
            return Err(AppError::Validation(
                "SERVER_RECORD_TTL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let http_timeout_seconds = parse_env_u64("HTTP_TIMEOUT_SECONDS", 15)?;
        if http_timeout_seconds == 0 {
            return Err(AppError::Validation(
                "HTTP_TIMEOUT_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            api_host,
            api_port,
            lock_store_backend,
            redis_url,
            redis_key_prefix,
            compute_api_base_url: required_non_empty_env("COMPUTE_API_BASE_URL")?,
            compute_api_token: optional_non_empty_env("COMPUTE_API_TOKEN"),
            naming_api_base_url: required_non_empty_env("NAMING_API_BASE_URL")?,
            naming_api_token: optional_non_empty_env("NAMING_API_TOKEN"),
            naming_zone_id: required_non_empty_env("NAMING_ZONE_ID")?,
            server_domain_name: required_non_empty_env("SERVER_DOMAIN_NAME")?,
            server_record_ttl_seconds,
            event_shared_secret: optional_non_empty_env("EVENT_SHARED_SECRET"),
            cors_allowed_origin: optional_non_empty_env("CORS_ALLOWED_ORIGIN"),
            http_timeout_seconds,
        })
    }

    /// Redis is only a hard dependency when it backs the lock.
    pub fn requires_redis(&self) -> bool {
        self.lock_store_backend == LockStoreBackend::Redis
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
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

fn parse_env_u32(name: &str, default: u32) -> Result<u32, AppError> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
