//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    billing_period::BillingPeriod,
    plan_tier::PlanTier,
    resource_type::ResourceType,
    subscription::{Subscription, SubscriptionStatus},
    usage_record::UsageRecord,
};

/// Fixed "now" used by fixtures: mid October 2026, UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

/// Create an active subscription covering [`test_now`].
pub fn create_test_subscription(
    user_id: Uuid,
    plan: PlanTier,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id,
        plan,
        status: SubscriptionStatus::Active,
        current_period_start: start,
        current_period_end: Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap(),
        created_at: start,
        updated_at: start,
    };
    overrides(&mut subscription);
    subscription
}

/// Create an untyped usage record in the period containing [`test_now`].
pub fn create_test_usage_record(
    user_id: Uuid,
    resource_type: ResourceType,
    overrides: impl FnOnce(&mut UsageRecord),
) -> UsageRecord {
    let mut record = UsageRecord {
        id: Uuid::new_v4(),
        user_id,
        resource_type,
        resource_subtype: None,
        usage_count: 1,
        period: BillingPeriod::containing(test_now()),
        metadata: serde_json::json!({}),
        created_at: test_now(),
        updated_at: test_now(),
    };
    overrides(&mut record);
    record
}
