use axum::{extract::State, Json};
use tracing::{debug, info};

use crate::{
    error::AppError,
    extract::Payload,
    middleware::auth::{issue_session_token, AuthUser},
    models::{self, AuthResponse, FirebaseLoginRequest, SessionUser, User},
    state::AppState,
};

pub async fn firebase_login(
    State(state): State<AppState>,
    Payload(req): Payload<FirebaseLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let firebase_token = req
        .firebase_token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::MissingIdentityToken)?;

    let user = state
        .identity
        .verify(&firebase_token)
        .await
        .and_then(|claims| claims.into_session_user())
        .map_err(|e| {
            debug!(error = %e, "rejected identity token");
            AppError::InvalidIdentityToken
        })?;

    record_login(&state, &user).await?;
    let token = issue_session_token(&user, &state.config.jwt_secret)?;
    info!(user_id = %user.id, verified = state.identity.is_verified(), "issued session token");

    Ok(Json(AuthResponse { token, user }))
}

/// Creates the user on first login, refreshes profile fields afterwards.
async fn record_login(state: &AppState, user: &SessionUser) -> Result<User, AppError> {
    let users = state.repo::<User>();
    let now = models::now();

    let record = match users.get(&user.id).await? {
        Some(existing) => User {
            email: user.email.clone(),
            name: user.name.clone(),
            last_login_at: now,
            ..existing
        },
        None => {
            info!(user_id = %user.id, "creating user on first login");
            User {
                id: user.id.clone(),
                email: user.email.clone(),
                name: user.name.clone(),
                created_at: now,
                last_login_at: now,
            }
        }
    };

    users.upsert(&record).await?;
    Ok(record)
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<SessionUser>, AppError> {
    let user = state.repo::<User>().get(&claims.user_id).await?;

    Ok(Json(match user {
        Some(user) => SessionUser::from(&user),
        None => SessionUser::from(&claims),
    }))
}
