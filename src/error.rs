use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{db::StoreError, quotes::QuoteError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Firebase token is required")]
    MissingIdentityToken,

    #[error("Invalid Firebase token")]
    InvalidIdentityToken,

    #[error("You do not own this resource")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Quote provider is not configured")]
    QuotesUnavailable,

    #[error("Quote provider error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Detail of a server-side fault, attached to 500 responses so the error
/// middleware can decide whether the client gets to see it.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

pub const GENERIC_FAULT: &str = "Something went wrong!";
pub const REDACTED_FAULT: &str = "Internal server error";

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::NotConfigured => AppError::QuotesUnavailable,
            QuoteError::UnknownSymbol(_) => AppError::NotFound("Quote"),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::MissingIdentityToken => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidIdentityToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::QuotesUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Quote provider request failed".into()),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                return fault_response(self.to_string());
            }
        };

        if let AppError::Upstream(detail) = &self {
            tracing::error!(%detail, "upstream request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// 500 response with the detail redacted; `middleware::errors` restores it
/// outside production.
pub fn fault_response(detail: String) -> Response {
    let body = Json(json!({
        "error": GENERIC_FAULT,
        "message": REDACTED_FAULT,
    }));

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    response.extensions_mut().insert(ErrorDetail(detail));
    response
}
