use std::{future::Future, time::Duration};

use crate::app_error::{AppError, AppResult};

/// Bounds a store call. A call that does not finish in time is reported as a
/// storage failure; the underlying operation is not cancelled on the server
/// and may still complete later.
pub async fn with_store_timeout<T, F>(limit: Duration, op: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, timeout_ms = limit.as_millis() as u64, "Store call timed out");
            Err(AppError::Storage(format!("{op} timed out")))
        }
    }
}
