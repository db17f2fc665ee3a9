use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

pub const AVAILABLE_ENDPOINTS: &[&str] = &[
    "/health",
    "/api/test",
    "/api/stocks/quote/:symbol",
    "/api/portfolio/*",
    "/api/auth/*",
    "/api/feedback/*",
    "/api/market-sentiment/*",
    "/api/quote/*",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub message: &'static str,
    pub port: u16,
    pub node_env: &'static str,
    pub mongo_uri: &'static str,
}

/// Diagnostic snapshot; never touches the database.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = &state.config;

    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        message: "Plan B Portfolio API is running",
        port: config.port,
        node_env: config.environment.as_str(),
        mongo_uri: if config.mongodb_uri_configured {
            "set"
        } else {
            "NOT CONFIGURED"
        },
    })
}

pub async fn api_test() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}

pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "message": "This is a backend API service. Frontend should be deployed separately.",
            "availableEndpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}
