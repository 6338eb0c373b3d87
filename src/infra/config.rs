use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::infra::error::InfraError;

/// Where usage counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageBackend {
    Postgres,
    Redis,
}

impl FromStr for UsageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(UsageBackend::Postgres),
            "redis" => Ok(UsageBackend::Redis),
            other => Err(format!("unknown usage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub usage_backend: UsageBackend,
    pub redis_url: String,
    /// Upper bound for every single store call made by the use cases.
    pub store_timeout: Duration,
    /// Optional JSON plan catalog. The built-in catalog is used when unset.
    pub plan_catalog_path: Option<PathBuf>,
    /// Reject unknown resource names instead of answering `no_access`.
    /// Meant for development.
    pub strict_resource_types: bool,
    pub reconcile_max_attempts: u32,
    pub reconcile_base_delay: Duration,
    pub expiry_sweep_interval: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid { var: "CORS_ORIGIN" })?;

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", String::from("127.0.0.1:3001"))
            .parse()
            .map_err(|_| InfraError::ConfigInvalid { var: "BIND_ADDR" })?;

        let database_url: String = get_env("DATABASE_URL");
        let db_max_connections: u32 =
            non_zero(get_env_default("DB_MAX_CONNECTIONS", 10), "DB_MAX_CONNECTIONS")?;

        let usage_backend: UsageBackend =
            get_env_default("USAGE_BACKEND", String::from("postgres"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid {
                    var: "USAGE_BACKEND",
                })?;
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());

        // A zero timeout would fail every check closed.
        let store_timeout_ms: u64 =
            non_zero(get_env_default("STORE_TIMEOUT_MS", 2_000), "STORE_TIMEOUT_MS")?;
        let plan_catalog_path: Option<PathBuf> = std::env::var("PLAN_CATALOG_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let strict_resource_types: bool = get_env_default("STRICT_RESOURCE_TYPES", false);

        let reconcile_max_attempts: u32 = get_env_default("RECONCILE_MAX_ATTEMPTS", 5);
        let reconcile_base_delay_ms: u64 = get_env_default("RECONCILE_BASE_DELAY_MS", 500);
        let expiry_sweep_secs: u64 = get_env_default("EXPIRY_SWEEP_SECS", 300);

        let log_format: LogFormat = get_env_default("LOG_FORMAT", String::from("pretty"))
            .parse()
            .map_err(|_| InfraError::ConfigInvalid { var: "LOG_FORMAT" })?;

        Ok(Self {
            jwt_secret,
            cors_origin,
            bind_addr,
            database_url,
            db_max_connections,
            usage_backend,
            redis_url,
            store_timeout: Duration::from_millis(store_timeout_ms),
            plan_catalog_path,
            strict_resource_types,
            reconcile_max_attempts,
            reconcile_base_delay: Duration::from_millis(reconcile_base_delay_ms),
            expiry_sweep_interval: Duration::from_secs(expiry_sweep_secs.max(1)),
            log_format,
        })
    }

    /// Configuration for tests that never touches the environment.
    #[cfg(test)]
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: SecretString::new(jwt_secret.into()),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: String::new(),
            db_max_connections: 1,
            usage_backend: UsageBackend::Postgres,
            redis_url: String::new(),
            store_timeout: Duration::from_secs(1),
            plan_catalog_path: None,
            strict_resource_types: false,
            reconcile_max_attempts: 3,
            reconcile_base_delay: Duration::from_millis(1),
            expiry_sweep_interval: Duration::from_secs(60),
            log_format: LogFormat::Pretty,
        }
    }
}

fn non_zero<T: Default + PartialEq>(value: T, var: &'static str) -> Result<T, InfraError> {
    if value == T::default() {
        return Err(InfraError::ConfigInvalid { var });
    }
    Ok(value)
}
