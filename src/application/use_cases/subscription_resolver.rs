use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::{clock::Clock, store_timeout::with_store_timeout},
    domain::entities::{plan_tier::PlanTier, subscription::Subscription},
};

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionRepoTrait: Send + Sync {
    /// Most recent subscription row for the user whose status can still grant
    /// a plan (`active` or `cancelled`). Period expiry is not checked here.
    async fn find_latest_entitling(&self, user_id: Uuid) -> AppResult<Option<Subscription>>;

    /// Mark every entitling row whose period ended before `now` as expired.
    /// Returns the number of rows changed.
    async fn expire_lapsed(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// No subscription row; the implicit free tier.
    Implicit,
    /// A subscription row within its period.
    Subscription,
    /// A subscription row whose period has ended.
    Lapsed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlan {
    pub tier: PlanTier,
    pub source: PlanSource,
    pub subscription_id: Option<Uuid>,
    pub current_period_end: Option<DateTime<Utc>>,
}

// ============================================================================
// Use Cases
// ============================================================================

/// Maps a user to the plan tier they are entitled to right now. Read-only.
#[derive(Clone)]
pub struct SubscriptionResolver {
    repo: Arc<dyn SubscriptionRepoTrait>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl SubscriptionResolver {
    pub fn new(
        repo: Arc<dyn SubscriptionRepoTrait>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            clock,
            store_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, user_id: Uuid) -> AppResult<PlanTier> {
        Ok(self.resolve_detailed(user_id).await?.tier)
    }

    #[instrument(skip(self))]
    pub async fn resolve_detailed(&self, user_id: Uuid) -> AppResult<ResolvedPlan> {
        let subscription = with_store_timeout(
            self.store_timeout,
            "find_latest_entitling",
            self.repo.find_latest_entitling(user_id),
        )
        .await?;

        let Some(subscription) = subscription else {
            debug!(%user_id, "No subscription, using free tier");
            return Ok(ResolvedPlan {
                tier: PlanTier::Free,
                source: PlanSource::Implicit,
                subscription_id: None,
                current_period_end: None,
            });
        };

        let now = self.clock.now();
        if subscription.has_lapsed(now) {
            debug!(
                %user_id,
                subscription_id = %subscription.id,
                period_end = %subscription.current_period_end,
                "Subscription period ended, using free tier"
            );
            return Ok(ResolvedPlan {
                tier: PlanTier::Free,
                source: PlanSource::Lapsed,
                subscription_id: Some(subscription.id),
                current_period_end: Some(subscription.current_period_end),
            });
        }

        debug!(
            %user_id,
            plan = %subscription.plan,
            status = %subscription.status,
            "Using subscription plan"
        );
        Ok(ResolvedPlan {
            tier: subscription.effective_tier(now),
            source: PlanSource::Subscription,
            subscription_id: Some(subscription.id),
            current_period_end: Some(subscription.current_period_end),
        })
    }
}
