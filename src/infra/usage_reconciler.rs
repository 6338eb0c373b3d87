use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use crate::application::{
    ports::deferred_usage::{DeferredUsage, DeferredUsageSink},
    use_cases::usage_tracker::UsageTracker,
};

const QUEUE_CAPACITY: usize = 1024;
const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the given zero-based attempt: `base * 2^attempt`,
    /// capped at five minutes.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Hands deferred increments to the reconciler without blocking the caller.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<DeferredUsage>,
}

impl DeferredUsageSink for ChannelSink {
    fn defer(&self, entry: DeferredUsage) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => log_lost(&entry, "reconcile queue full"),
            Err(TrySendError::Closed(entry)) => log_lost(&entry, "reconciler not running"),
        }
    }
}

pub fn usage_reconcile_channel() -> (ChannelSink, mpsc::Receiver<DeferredUsage>) {
    channel_with_capacity(QUEUE_CAPACITY)
}

fn channel_with_capacity(capacity: usize) -> (ChannelSink, mpsc::Receiver<DeferredUsage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelSink { tx }, rx)
}

/// Retries deferred increments against their original key until the
/// channel closes. Entries are handled one at a time.
pub async fn run_usage_reconciler(
    mut rx: mpsc::Receiver<DeferredUsage>,
    tracker: UsageTracker,
    policy: RetryPolicy,
) {
    info!(
        max_attempts = policy.max_attempts,
        base_delay_ms = policy.base_delay.as_millis() as u64,
        "Usage reconciler started"
    );

    while let Some(entry) = rx.recv().await {
        reconcile_one(&tracker, entry, policy).await;
    }

    info!("Usage reconciler stopped");
}

/// Returns true once the increment has been written. Only transient store
/// errors are retried.
pub async fn reconcile_one(tracker: &UsageTracker, entry: DeferredUsage, policy: RetryPolicy) -> bool {
    let mut last_error = entry.last_error.clone();
    let mut cause = "retries exhausted";

    for attempt in 0..policy.max_attempts {
        tokio::time::sleep(policy.delay_for(attempt)).await;

        match tracker.record_key(&entry.key, &entry.metadata).await {
            Ok(count) => {
                info!(
                    user_id = %entry.key.user_id,
                    resource = %entry.key.resource_type,
                    period_start = %entry.key.period.start,
                    attempt = attempt + 1,
                    count,
                    "Deferred usage reconciled"
                );
                return true;
            }
            Err(e) if !e.is_transient() => {
                last_error = e.to_string();
                cause = "permanent store error";
                break;
            }
            Err(e) => {
                warn!(
                    user_id = %entry.key.user_id,
                    resource = %entry.key.resource_type,
                    attempt = attempt + 1,
                    error = %e,
                    "Deferred usage retry failed"
                );
                last_error = e.to_string();
            }
        }
    }

    log_lost(
        &DeferredUsage {
            last_error,
            ..entry
        },
        cause,
    );
    false
}

fn log_lost(entry: &DeferredUsage, cause: &str) {
    error!(
        user_id = %entry.key.user_id,
        resource = %entry.key.resource_type,
        subtype = ?entry.key.resource_subtype,
        period_start = %entry.key.period.start,
        period_end = %entry.key.period.end,
        failed_at = %entry.failed_at,
        metadata = %entry.metadata,
        error = %entry.last_error,
        cause,
        "Usage increment lost, reconcile manually"
    );
}
