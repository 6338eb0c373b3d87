//! In-memory mock implementations for the subscription repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::subscription_resolver::SubscriptionRepoTrait,
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let map: HashMap<Uuid, Subscription> =
            subscriptions.into_iter().map(|s| (s.id, s)).collect();
        Self {
            subscriptions: Mutex::new(map),
        }
    }

    pub fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription);
    }

    pub fn get(&self, id: Uuid) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl SubscriptionRepoTrait for InMemorySubscriptionRepo {
    async fn find_latest_entitling(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id && s.status.is_entitling())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let mut changed = 0;
        for subscription in subscriptions.values_mut() {
            if subscription.status.is_entitling() && subscription.has_lapsed(now) {
                subscription.status = SubscriptionStatus::Expired;
                subscription.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ============================================================================
// FailingSubscriptionRepo
// ============================================================================

/// Every call fails as if the store were unreachable.
#[derive(Default)]
pub struct FailingSubscriptionRepo;

#[async_trait]
impl SubscriptionRepoTrait for FailingSubscriptionRepo {
    async fn find_latest_entitling(&self, _user_id: Uuid) -> AppResult<Option<Subscription>> {
        Err(AppError::Storage("subscription store unavailable".into()))
    }

    async fn expire_lapsed(&self, _now: DateTime<Utc>) -> AppResult<u64> {
        Err(AppError::Storage("subscription store unavailable".into()))
    }
}
