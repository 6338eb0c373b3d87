pub mod access;
pub mod billing_period;
pub mod feature_flag;
pub mod plan_tier;
pub mod resource_type;
pub mod subscription;
pub mod usage_limit;
pub mod usage_record;
