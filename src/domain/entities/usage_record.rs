use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{billing_period::BillingPeriod, resource_type::ResourceType};

/// Composite identity of a usage counter. One record exists per key once
/// the resource has been used in that period.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub user_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_subtype: Option<String>,
    pub period: BillingPeriod,
}

impl UsageKey {
    pub fn new(
        user_id: Uuid,
        resource_type: ResourceType,
        resource_subtype: Option<String>,
        period: BillingPeriod,
    ) -> Self {
        // Blank subtypes collapse onto the untyped counter.
        let resource_subtype = resource_subtype
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self {
            user_id,
            resource_type,
            resource_subtype,
            period,
        }
    }

    /// Subtype as persisted; the untyped counter is stored as an empty string
    /// so the uniqueness constraint covers it.
    pub fn stored_subtype(&self) -> &str {
        self.resource_subtype.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_type: ResourceType,
    pub resource_subtype: Option<String>,
    pub usage_count: i64,
    pub period: BillingPeriod,
    /// Last-write-merged context; informational only.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
