use chrono::{DateTime, Utc};

use crate::domain::entities::usage_record::UsageKey;

/// An increment that could not be written when the action completed.
#[derive(Debug, Clone)]
pub struct DeferredUsage {
    pub key: UsageKey,
    pub metadata: serde_json::Value,
    pub failed_at: DateTime<Utc>,
    pub last_error: String,
}

/// Receives increments that must be retried out of band.
///
/// Implementations must not block the caller; an increment that cannot be
/// queued is dropped after being logged.
pub trait DeferredUsageSink: Send + Sync {
    fn defer(&self, entry: DeferredUsage);
}
