use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, feedback, market_sentiment, portfolio, quote, system},
    middleware::{errors, security::with_security_headers},
    state::AppState,
};

pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.frontend_origin())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let environment = state.config.environment;

    let routes = Router::new()
        .route("/health", get(system::health))
        .route("/api/test", get(system::api_test))
        .route("/api/stocks/quote/:symbol", get(quote::mock_stock_quote))
        .route("/api/auth/firebase", post(auth::firebase_login))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/portfolio",
            get(portfolio::list_entries).post(portfolio::create_entry),
        )
        .route("/api/portfolio/summary", get(portfolio::summary))
        .route(
            "/api/portfolio/:id",
            get(portfolio::get_entry)
                .put(portfolio::update_entry)
                .delete(portfolio::delete_entry),
        )
        .route(
            "/api/feedback",
            get(feedback::list_feedback).post(feedback::submit_feedback),
        )
        .route(
            "/api/feedback/:id",
            get(feedback::get_feedback).delete(feedback::delete_feedback),
        )
        .route(
            "/api/market-sentiment",
            get(market_sentiment::list_sentiment).post(market_sentiment::create_sentiment),
        )
        .route(
            "/api/market-sentiment/summary",
            get(market_sentiment::sentiment_summary),
        )
        .route(
            "/api/market-sentiment/:id",
            get(market_sentiment::get_sentiment)
                .put(market_sentiment::update_sentiment)
                .delete(market_sentiment::delete_sentiment),
        )
        .route("/api/quote", get(quote::get_quotes))
        .route("/api/quote/:symbol", get(quote::get_quote))
        .fallback(system::not_found)
        .method_not_allowed_fallback(system::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors);

    // Layers wrap everything added before them, so the last one runs first.
    with_security_headers(routes)
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(from_fn_with_state(environment, errors::reveal_error_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
