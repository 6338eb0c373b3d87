use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::{adapters::http::app_state::AppState, app_error::AppError, application::jwt};

/// Authenticated caller. Accepts `Authorization: Bearer <token>` or the
/// `access_token` cookie.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = CookieJar::from_headers(&parts.headers);
        let token = bearer_token(parts)
            .or_else(|| cookies.get("access_token").map(|c| c.value().to_owned()))
            .ok_or(AppError::AuthenticationRequired)?;

        let user_id = jwt::user_id_from_token(&token, &state.config.jwt_secret)?;
        tracing::debug!(%user_id, "Authenticated request");
        Ok(CurrentUser(user_id))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}
