pub mod features;
pub mod plan;
pub mod usage;

use std::str::FromStr;

use axum::Router;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::resource_type::ResourceType,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/plan", plan::router())
        .nest("/usage", usage::router())
        .nest("/features", features::router())
}

/// Path segments naming a resource must be known; unknown names cannot be
/// recorded or reported on.
pub(crate) fn parse_resource(name: &str) -> AppResult<ResourceType> {
    ResourceType::from_str(name).map_err(|_| AppError::InvalidResourceType(name.to_string()))
}
