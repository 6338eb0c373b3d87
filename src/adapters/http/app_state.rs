use std::sync::Arc;

use crate::{application::use_cases::feature_gate::FeatureGate, infra::config::AppConfig};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub feature_gate: Arc<FeatureGate>,
}
