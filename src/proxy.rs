//! Frontend-facing reverse proxy.
//!
//! Browsers talk to the frontend origin only; calls under
//! `/api/<service>/...` are rewritten onto the backend's base URL, which
//! depends on the environment.

use std::{env, sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::{
    app::BODY_LIMIT_BYTES,
    config::{ConfigError, Environment},
};

/// Services whose `/api/<service>/:path*` calls are forwarded.
pub const PROXIED_SERVICES: &[&str] = &["market-sentiment", "portfolio", "auth", "feedback", "quote"];

const DEVELOPMENT_BACKEND: &str = "http://localhost:5001";
const DEPLOYED_BACKEND: &str = "https://plan-b-p4t8.onrender.com";
const DEFAULT_PROXY_PORT: u16 = 3000;
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub port: u16,
    pub environment: Environment,
    pub backend_url: String,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match var("NODE_ENV") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "NODE_ENV",
                value: raw,
                reason,
            })?,
            None => Environment::Development,
        };

        let port = match var("PROXY_PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "PROXY_PORT",
                value: raw,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PROXY_PORT,
        };

        let backend_url = match var("BACKEND_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                url.trim_end_matches('/').to_string()
            }
            Some(url) => {
                return Err(ConfigError::Invalid {
                    key: "BACKEND_URL",
                    value: url,
                    reason: "must start with http:// or https://".into(),
                })
            }
            None if environment == Environment::Development => DEVELOPMENT_BACKEND.into(),
            None => DEPLOYED_BACKEND.into(),
        };

        Ok(Self {
            port,
            environment,
            backend_url,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteRule {
    /// e.g. `/api/portfolio`, matched as `/api/portfolio/:path*`.
    pub source_prefix: String,
    pub destination_prefix: String,
}

#[derive(Clone, Debug)]
pub struct RewriteTable {
    rules: Vec<RewriteRule>,
}

impl RewriteTable {
    pub fn for_backend(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let rules = PROXIED_SERVICES
            .iter()
            .map(|service| RewriteRule {
                source_prefix: format!("/api/{service}"),
                destination_prefix: format!("{base_url}/api/{service}"),
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// Destination URL for a request path, or `None` when no rule matches.
    pub fn rewrite(&self, path: &str, query: Option<&str>) -> Option<String> {
        self.rules.iter().find_map(|rule| {
            let rest = path.strip_prefix(rule.source_prefix.as_str())?;
            if !(rest.is_empty() || rest.starts_with('/')) {
                return None;
            }

            let mut url = format!("{}{rest}", rule.destination_prefix);
            if let Some(query) = query.filter(|q| !q.is_empty()) {
                url.push('?');
                url.push_str(query);
            }
            Some(url)
        })
    }
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("request body rejected: {0}")]
    Body(#[from] axum::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::Body(_) => (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"),
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Backend unavailable"),
        };
        error!(error = %self, "proxy request failed");

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Clone)]
pub struct ProxyState {
    table: Arc<RewriteTable>,
    client: reqwest::Client,
}

impl ProxyState {
    pub fn new(table: RewriteTable) -> Result<Self, reqwest::Error> {
        Ok(Self {
            table: Arc::new(table),
            client: reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?,
        })
    }
}

pub fn create_proxy(state: ProxyState) -> Router {
    Router::new()
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn forward(State(state): State<ProxyState>, request: Request) -> Response {
    let target = state
        .table
        .rewrite(request.uri().path(), request.uri().query());

    match target {
        Some(target) => relay(&state.client, target, request)
            .await
            .unwrap_or_else(IntoResponse::into_response),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Route not found",
                "message": "No rewrite rule matches this path",
            })),
        )
            .into_response(),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

async fn relay(client: &reqwest::Client, target: String, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, BODY_LIMIT_BYTES).await?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    if let Some(host) = headers.remove(header::HOST) {
        headers.insert(HeaderName::from_static("x-forwarded-host"), host);
    }

    debug!(method = %parts.method, %target, "forwarding");
    let upstream = client
        .request(parts.method, &target)
        .headers(headers)
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let bytes = upstream.bytes().await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
