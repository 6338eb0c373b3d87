//! In-memory mock implementations for usage tracking.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        clock::Clock,
        ports::deferred_usage::{DeferredUsage, DeferredUsageSink},
        use_cases::usage_tracker::UsageRepoTrait,
    },
    domain::entities::{
        billing_period::BillingPeriod,
        usage_record::{UsageKey, UsageRecord},
    },
};

// ============================================================================
// InMemoryUsageRepo
// ============================================================================

/// Usage store backed by a single mutex, so every increment is atomic with
/// respect to every other.
#[derive(Default)]
pub struct InMemoryUsageRepo {
    pub records: Mutex<HashMap<UsageKey, UsageRecord>>,
}

impl InMemoryUsageRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of untyped (total) counters across all users and periods.
    pub fn record_count(&self) -> usize {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.resource_subtype.is_none())
            .count()
    }

    pub fn count_for(&self, key: &UsageKey) -> i64 {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .map(|r| r.usage_count)
            .unwrap_or(0)
    }
}

fn bump(
    records: &mut HashMap<UsageKey, UsageRecord>,
    key: UsageKey,
    metadata_patch: &serde_json::Value,
) -> i64 {
    let now = Utc::now();
    let record = records.entry(key.clone()).or_insert_with(|| UsageRecord {
        id: Uuid::new_v4(),
        user_id: key.user_id,
        resource_type: key.resource_type,
        resource_subtype: key.resource_subtype.clone(),
        usage_count: 0,
        period: key.period,
        metadata: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    });
    record.usage_count += 1;
    record.updated_at = now;
    if let (Some(stored), Some(patch)) = (record.metadata.as_object_mut(), metadata_patch.as_object())
    {
        for (k, v) in patch {
            stored.insert(k.clone(), v.clone());
        }
    }
    record.usage_count
}

#[async_trait]
impl UsageRepoTrait for InMemoryUsageRepo {
    async fn get(&self, key: &UsageKey) -> AppResult<Option<UsageRecord>> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn increment(
        &self,
        key: &UsageKey,
        metadata_patch: &serde_json::Value,
    ) -> AppResult<i64> {
        let mut records = self.records.lock().unwrap();
        let total_key = UsageKey::new(key.user_id, key.resource_type, None, key.period);
        let total = bump(&mut records, total_key, metadata_patch);
        if key.resource_subtype.is_some() {
            bump(&mut records, key.clone(), metadata_patch);
        }
        Ok(total)
    }

    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && r.period == period)
            .cloned()
            .collect())
    }
}

// ============================================================================
// FailingUsageRepo
// ============================================================================

/// Every call fails as if the store were unreachable.
#[derive(Default)]
pub struct FailingUsageRepo;

#[async_trait]
impl UsageRepoTrait for FailingUsageRepo {
    async fn get(&self, _key: &UsageKey) -> AppResult<Option<UsageRecord>> {
        Err(AppError::Storage("usage store unavailable".into()))
    }

    async fn increment(
        &self,
        _key: &UsageKey,
        _metadata_patch: &serde_json::Value,
    ) -> AppResult<i64> {
        Err(AppError::Storage("usage store unavailable".into()))
    }

    async fn list_for_period(
        &self,
        _user_id: Uuid,
        _period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>> {
        Err(AppError::Storage("usage store unavailable".into()))
    }
}

// ============================================================================
// RejectingUsageRepo
// ============================================================================

/// Reads succeed with nothing stored; every increment is rejected with a
/// non-storage error. Counts the increments it sees.
#[derive(Default)]
pub struct RejectingUsageRepo {
    attempts: AtomicU32,
}

impl RejectingUsageRepo {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageRepoTrait for RejectingUsageRepo {
    async fn get(&self, _key: &UsageKey) -> AppResult<Option<UsageRecord>> {
        Ok(None)
    }

    async fn increment(
        &self,
        _key: &UsageKey,
        _metadata_patch: &serde_json::Value,
    ) -> AppResult<i64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Internal("usage row rejected".into()))
    }

    async fn list_for_period(
        &self,
        _user_id: Uuid,
        _period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// FlakyUsageRepo
// ============================================================================

/// Fails the first `failures` increments, then behaves like the inner store.
pub struct FlakyUsageRepo {
    pub inner: InMemoryUsageRepo,
    failures_left: AtomicU32,
}

impl FlakyUsageRepo {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: InMemoryUsageRepo::new(),
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl UsageRepoTrait for FlakyUsageRepo {
    async fn get(&self, key: &UsageKey) -> AppResult<Option<UsageRecord>> {
        self.inner.get(key).await
    }

    async fn increment(
        &self,
        key: &UsageKey,
        metadata_patch: &serde_json::Value,
    ) -> AppResult<i64> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::Storage("transient failure".into()));
        }
        self.inner.increment(key, metadata_patch).await
    }

    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>> {
        self.inner.list_for_period(user_id, period).await
    }
}

// ============================================================================
// FixedClock
// ============================================================================

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// RecordingSink
// ============================================================================

/// Deferred usage sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub entries: Mutex<Vec<DeferredUsage>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<DeferredUsage> {
        std::mem::take(&mut *self.entries.lock().unwrap())
    }
}

impl DeferredUsageSink for RecordingSink {
    fn defer(&self, entry: DeferredUsage) {
        self.entries.lock().unwrap().push(entry);
    }
}
