use sqlx::PgPool;

use crate::app_error::AppError;

pub mod subscription;
pub mod usage_record;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::warn!(error = %err, "Database unavailable");
                AppError::Storage("Database unavailable".into())
            }
            _ => {
                // Log the actual error for debugging, but don't expose details
                tracing::error!(error = ?err, "Database error");
                AppError::Storage("Database operation failed".into())
            }
        }
    }
}
