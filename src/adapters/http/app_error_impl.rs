use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "Request failed");
            }
            _ => tracing::debug!(error = %self, "Request rejected"),
        }

        match self {
            AppError::Storage(_) => {
                error_resp(StatusCode::SERVICE_UNAVAILABLE, ErrorCode::StorageError, None)
            }
            AppError::AuthenticationRequired => error_resp(
                StatusCode::UNAUTHORIZED,
                ErrorCode::AuthenticationRequired,
                None,
            ),
            AppError::LimitExceeded {
                resource,
                current_usage,
                usage_limit,
            } => {
                let body = json!({
                    "code": ErrorCode::LimitExceeded.as_str(),
                    "message": format!("Usage limit reached for {resource}"),
                    "resource": resource,
                    "current_usage": current_usage,
                    "usage_limit": usage_limit,
                });
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            }
            AppError::NoAccess {
                resource,
                current_usage,
            } => {
                let body = json!({
                    "code": ErrorCode::NoAccess.as_str(),
                    "message": format!("{resource} is not included in the current plan"),
                    "resource": resource,
                    "current_usage": current_usage,
                });
                (StatusCode::FORBIDDEN, Json(body)).into_response()
            }
            AppError::InvalidResourceType(name) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidResourceType,
                Some(format!("Unknown resource type: {name}")),
            ),
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => json!({ "code": code.as_str(), "message": msg }),
        None => json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
