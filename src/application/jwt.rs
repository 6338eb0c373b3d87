use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// Claims carried by access tokens issued by the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn verify(token: &str, secret: &SecretString) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::AuthenticationRequired
    })
}

/// Resolve the user id from a verified token.
pub fn user_id_from_token(token: &str, secret: &SecretString) -> AppResult<Uuid> {
    let claims = verify(token, secret)?;
    Uuid::parse_str(&claims.sub).map_err(|_| AppError::AuthenticationRequired)
}

#[cfg(test)]
pub(crate) fn issue_for_tests(user_id: Uuid, secret: &SecretString, ttl_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .unwrap()
}
