use std::time::Duration;

use crate::{
    adapters::persistence::PostgresPersistence,
    infra::{db::init_db, error::InfraError},
};

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod redis_usage;
pub mod setup;
pub mod subscription_expiry;
pub mod usage_reconciler;

pub async fn postgres_persistence(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PostgresPersistence, InfraError> {
    let pool = init_db(database_url, max_connections, acquire_timeout).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
