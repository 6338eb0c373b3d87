pub mod feature_gate;
pub mod plan_catalog;
pub mod subscription_resolver;
pub mod usage_tracker;
