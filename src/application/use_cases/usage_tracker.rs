use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{
        clock::Clock, store_timeout::with_store_timeout, use_cases::plan_catalog::FeatureLimits,
    },
    domain::entities::{
        billing_period::BillingPeriod,
        resource_type::ResourceType,
        usage_limit::UsageLimit,
        usage_record::{UsageKey, UsageRecord},
    },
};

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait UsageRepoTrait: Send + Sync {
    async fn get(&self, key: &UsageKey) -> AppResult<Option<UsageRecord>>;

    /// Add one unit in a single atomic step and return the new count of the
    /// untyped counter for (user, resource, period).
    ///
    /// When the key carries a subtype, the subtype's own counter is bumped in
    /// the same step, so the untyped counter is always the resource total.
    /// Creates the record(s) if absent. `metadata_patch` is merged over the
    /// stored metadata (last write wins per field).
    async fn increment(&self, key: &UsageKey, metadata_patch: &serde_json::Value)
    -> AppResult<i64>;

    /// Every record the user has in the given period, including subtype rows.
    async fn list_for_period(
        &self,
        user_id: Uuid,
        period: BillingPeriod,
    ) -> AppResult<Vec<UsageRecord>>;
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub current: i64,
    pub limit: UsageLimit,
    pub remaining: i64,
    pub is_unlimited: bool,
    pub percent_used: f64,
    pub period: BillingPeriod,
}

impl UsageStats {
    pub fn compute(current: i64, limit: UsageLimit, period: BillingPeriod) -> Self {
        Self {
            current,
            limit,
            remaining: limit.remaining(current),
            is_unlimited: limit.is_unlimited(),
            percent_used: limit.percent_used(current),
            period,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageCheck {
    pub can_use: bool,
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceUsage {
    pub resource: ResourceType,
    #[serde(flatten)]
    pub stats: UsageStats,
    /// Per-subtype breakdown for the period, when any were recorded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<SubtypeUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubtypeUsage {
    pub subtype: String,
    pub count: i64,
}

// ============================================================================
// Use Cases
// ============================================================================

/// Reports and advances per-period usage counters.
#[derive(Clone)]
pub struct UsageTracker {
    repo: Arc<dyn UsageRepoTrait>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl UsageTracker {
    pub fn new(repo: Arc<dyn UsageRepoTrait>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            repo,
            clock,
            store_timeout,
        }
    }

    pub fn current_period(&self) -> BillingPeriod {
        BillingPeriod::containing(self.clock.now())
    }

    #[instrument(skip(self))]
    pub async fn stats_for(
        &self,
        user_id: Uuid,
        resource: ResourceType,
        limit: UsageLimit,
    ) -> AppResult<UsageStats> {
        let period = self.current_period();
        let key = UsageKey::new(user_id, resource, None, period);
        let record = with_store_timeout(self.store_timeout, "usage_get", self.repo.get(&key)).await?;
        let current = record.map(|r| r.usage_count).unwrap_or(0);

        Ok(UsageStats::compute(current, limit, period))
    }

    #[instrument(skip(self))]
    pub async fn can_use(
        &self,
        user_id: Uuid,
        resource: ResourceType,
        limit: UsageLimit,
    ) -> AppResult<UsageCheck> {
        let stats = self.stats_for(user_id, resource, limit).await?;
        Ok(UsageCheck {
            can_use: limit.allows_one_more(stats.current),
            remaining: stats.remaining,
        })
    }

    /// Record one unit in the current period. Returns the new total.
    #[instrument(skip(self, metadata))]
    pub async fn record(
        &self,
        user_id: Uuid,
        resource: ResourceType,
        subtype: Option<String>,
        metadata: &serde_json::Value,
    ) -> AppResult<i64> {
        let key = UsageKey::new(user_id, resource, subtype, self.current_period());
        self.record_key(&key, metadata).await
    }

    /// Record one unit against an explicit key, e.g. when replaying an
    /// increment into the period it originally belonged to.
    pub async fn record_key(&self, key: &UsageKey, metadata: &serde_json::Value) -> AppResult<i64> {
        let count = with_store_timeout(
            self.store_timeout,
            "usage_increment",
            self.repo.increment(key, metadata),
        )
        .await?;

        debug!(
            user_id = %key.user_id,
            resource = %key.resource_type,
            subtype = ?key.resource_subtype,
            period = %key.period.label(),
            count,
            "Usage recorded"
        );
        Ok(count)
    }

    /// Stats for every resource type in the current period, one store read.
    #[instrument(skip(self, limits))]
    pub async fn summary(
        &self,
        user_id: Uuid,
        limits: &FeatureLimits,
    ) -> AppResult<Vec<ResourceUsage>> {
        use strum::IntoEnumIterator;

        let period = self.current_period();
        let records = with_store_timeout(
            self.store_timeout,
            "usage_list",
            self.repo.list_for_period(user_id, period),
        )
        .await?;

        Ok(ResourceType::iter()
            .map(|resource| {
                let current = records
                    .iter()
                    .find(|r| r.resource_type == resource && r.resource_subtype.is_none())
                    .map(|r| r.usage_count)
                    .unwrap_or(0);
                let mut subtypes: Vec<SubtypeUsage> = records
                    .iter()
                    .filter(|r| r.resource_type == resource)
                    .filter_map(|r| {
                        r.resource_subtype.as_ref().map(|s| SubtypeUsage {
                            subtype: s.clone(),
                            count: r.usage_count,
                        })
                    })
                    .collect();
                subtypes.sort_by(|a, b| a.subtype.cmp(&b.subtype));

                ResourceUsage {
                    resource,
                    stats: UsageStats::compute(current, limits.limit(resource), period),
                    subtypes,
                }
            })
            .collect())
    }
}
