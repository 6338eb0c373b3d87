use thiserror::Error;

use crate::application::use_cases::plan_catalog::CatalogError;

/// Infrastructure errors that can occur during application startup.
///
/// Display messages are safe for logs. Debug output includes the #[source]
/// chain, which may contain connection strings; log with `%e`, not `?e`.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Database connection failed. Check DATABASE_URL and ensure the database is running.")]
    DatabaseConnection(#[source] sqlx::Error),

    #[error("Database migration failed")]
    Migration(#[source] sqlx::migrate::MigrateError),

    #[error("Redis connection failed. Check REDIS_URL and credentials.")]
    RedisConnection(#[source] redis::RedisError),

    #[error("Configuration error: environment variable {var} is invalid")]
    ConfigInvalid { var: &'static str },

    #[error("Plan catalog could not be loaded")]
    Catalog(#[source] CatalogError),

    #[error("TCP bind failed")]
    TcpBind(#[source] std::io::Error),

    #[error("Server error")]
    Server(#[source] std::io::Error),
}

impl From<sqlx::Error> for InfraError {
    fn from(e: sqlx::Error) -> Self {
        InfraError::DatabaseConnection(e)
    }
}

impl From<CatalogError> for InfraError {
    fn from(e: CatalogError) -> Self {
        InfraError::Catalog(e)
    }
}
