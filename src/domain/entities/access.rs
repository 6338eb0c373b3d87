use serde::{Deserialize, Serialize};

use super::{plan_tier::PlanTier, resource_type::ResourceType, usage_limit::UsageLimit};

/// Why a user was refused one more unit of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The plan's limit for the resource is zero.
    NoAccess,
    /// The plan's numeric cap for this period has been reached.
    LimitExceeded,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoAccess => "no_access",
            DenialReason::LimitExceeded => "limit_exceeded",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer to "may this user consume one more unit right now".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessDecision {
    pub resource: Option<ResourceType>,
    pub can_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    pub current_usage: i64,
    pub usage_limit: UsageLimit,
    pub remaining: i64,
    pub plan: PlanTier,
}

impl AccessDecision {
    /// Decision for a resource name the caller could not map onto a known
    /// resource type.
    pub fn unknown_resource(plan: PlanTier) -> Self {
        Self {
            resource: None,
            can_access: false,
            reason: Some(DenialReason::NoAccess),
            current_usage: 0,
            usage_limit: UsageLimit::NONE,
            remaining: 0,
            plan,
        }
    }
}
