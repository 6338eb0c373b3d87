use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::{
    adapters::http::{app_state::AppState, auth::CurrentUser, routes::parse_resource},
    app_error::AppResult,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(usage_summary))
        .route("/{resource}", get(usage_for_resource))
}

async fn usage_summary(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let summary = app_state.feature_gate.usage_summary(user_id).await?;
    Ok(Json(summary))
}

async fn usage_for_resource(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(resource): Path<String>,
) -> AppResult<impl IntoResponse> {
    let resource = parse_resource(&resource)?;
    let stats = app_state.feature_gate.usage_for(user_id, resource).await?;
    Ok(Json(stats))
}
