use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::SessionUser, state::AppState};

pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<&Claims> for SessionUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.user_id.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
        }
    }
}

/// Signs a session token for `user`, valid for [`SESSION_TTL_DAYS`].
pub fn issue_session_token(user: &SessionUser, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        user_id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_session_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "rejected session token");
        AppError::Unauthorized
    })
}

/// Caller authenticated by a `Bearer` session token.
pub struct AuthUser(pub Claims);

/// Like [`AuthUser`] but the header may be absent. A header that is present
/// and invalid is still rejected.
pub struct MaybeAuthUser(pub Option<Claims>);

fn bearer(parts: &Parts) -> Option<Result<&str, AppError>> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?;
    Some(
        header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(AppError::Unauthorized),
    )
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or(AppError::Unauthorized)??;
        verify_session_token(token, &state.config.jwt_secret).map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer(parts) {
            None => Ok(MaybeAuthUser(None)),
            Some(token) => verify_session_token(token?, &state.config.jwt_secret).map(|c| MaybeAuthUser(Some(c))),
        }
    }
}
