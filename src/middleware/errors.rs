use std::any::Any;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    config::Environment,
    error::{fault_response, ErrorDetail, GENERIC_FAULT},
};

/// Puts the fault detail back into 500 bodies outside production.
pub async fn reveal_error_detail(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if environment.is_production() {
        return response;
    }

    match response.extensions().get::<ErrorDetail>() {
        Some(ErrorDetail(detail)) => {
            let body = Json(json!({ "error": GENERIC_FAULT, "message": detail }));
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
        None => response,
    }
}

/// Response for a handler that panicked; used with `CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    tracing::error!(%detail, "handler panicked");
    fault_response(detail)
}
