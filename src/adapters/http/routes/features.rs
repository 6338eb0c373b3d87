use std::{convert::Infallible, str::FromStr};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    adapters::http::{app_state::AppState, auth::CurrentUser, routes::parse_resource},
    app_error::{AppError, AppResult},
    application::use_cases::feature_gate::{MeteredError, RecordOutcome},
    domain::entities::feature_flag::FeatureFlag,
};

const MAX_METADATA_BYTES: usize = 4096;

#[derive(Debug, Default, Deserialize, Validate)]
struct RecordUsagePayload {
    #[validate(length(min = 1, max = 64))]
    subtype: Option<String>,
    #[validate(custom(function = "validate_metadata"))]
    metadata: Option<serde_json::Value>,
}

fn validate_metadata(metadata: &serde_json::Value) -> Result<(), ValidationError> {
    if !metadata.is_object() {
        return Err(ValidationError::new("metadata_not_object"));
    }
    if metadata.to_string().len() > MAX_METADATA_BYTES {
        return Err(ValidationError::new("metadata_too_large"));
    }
    Ok(())
}

#[derive(Serialize)]
struct RecordResponse {
    recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<i64>,
}

fn record_response(outcome: RecordOutcome) -> (StatusCode, Json<RecordResponse>) {
    match outcome {
        RecordOutcome::Recorded { count } => (
            StatusCode::OK,
            Json(RecordResponse {
                recorded: true,
                count: Some(count),
            }),
        ),
        // Deferred writes are retried in the background.
        RecordOutcome::Deferred => (
            StatusCode::ACCEPTED,
            Json(RecordResponse {
                recorded: false,
                count: None,
            }),
        ),
    }
}

#[derive(Serialize)]
struct FlagResponse {
    flag: FeatureFlag,
    enabled: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/flags/{flag}", get(flag_enabled))
        .route("/{resource}/access", get(check_access))
        .route("/{resource}/usage", post(record_usage))
        .route("/{resource}/consume", post(consume))
}

async fn check_access(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(resource): Path<String>,
) -> AppResult<impl IntoResponse> {
    let decision = app_state
        .feature_gate
        .check_access_by_name(user_id, &resource)
        .await?;
    Ok(Json(decision))
}

/// Record one unit after the caller's action already succeeded.
async fn record_usage(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(resource): Path<String>,
    payload: Option<Json<RecordUsagePayload>>,
) -> AppResult<impl IntoResponse> {
    let resource = parse_resource(&resource)?;
    let payload = validated(payload)?;

    let outcome = app_state
        .feature_gate
        .record_usage(
            user_id,
            resource,
            payload.subtype,
            payload.metadata.unwrap_or_else(|| serde_json::json!({})),
        )
        .await;
    Ok(record_response(outcome))
}

/// Check and record in one call, for actions with no separate success step.
async fn consume(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(resource): Path<String>,
    payload: Option<Json<RecordUsagePayload>>,
) -> AppResult<impl IntoResponse> {
    let resource = parse_resource(&resource)?;
    let payload = validated(payload)?;

    let ((), outcome) = app_state
        .feature_gate
        .run_metered(
            user_id,
            resource,
            payload.subtype,
            payload.metadata.unwrap_or_else(|| serde_json::json!({})),
            || async { Ok::<(), Infallible>(()) },
        )
        .await
        .map_err(|e| match e {
            MeteredError::Gate(e) => e,
            MeteredError::Action(never) => match never {},
        })?;
    Ok(record_response(outcome))
}

async fn flag_enabled(
    State(app_state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(flag): Path<String>,
) -> AppResult<impl IntoResponse> {
    let flag = FeatureFlag::from_str(&flag)
        .map_err(|_| AppError::InvalidInput(format!("Unknown feature flag: {flag}")))?;
    let enabled = app_state.feature_gate.has_feature(user_id, flag).await;
    Ok(Json(FlagResponse { flag, enabled }))
}

fn validated(payload: Option<Json<RecordUsagePayload>>) -> AppResult<RecordUsagePayload> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    Ok(payload)
}
