use axum::{extract::State, Json};
use futures::future::try_join_all;

use crate::{
    error::AppError,
    extract::{PathParam, QueryParams},
    models::{normalize_symbol, MockStockQuote, Quote, QuoteQuery},
    state::AppState,
};

const MAX_BATCH: usize = 20;

pub async fn get_quote(
    State(state): State<AppState>,
    PathParam(symbol): PathParam<String>,
) -> Result<Json<Quote>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    Ok(Json(state.quotes.quote(&symbol).await?))
}

pub async fn get_quotes(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<QuoteQuery>,
) -> Result<Json<Vec<Quote>>, AppError> {
    let raw = query
        .symbols
        .ok_or_else(|| AppError::BadRequest("symbols query parameter is required".into()))?;

    let mut symbols = Vec::new();
    for part in raw.split(',').filter(|s| !s.trim().is_empty()) {
        let symbol = normalize_symbol(part)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        return Err(AppError::BadRequest("symbols query parameter is required".into()));
    }
    if symbols.len() > MAX_BATCH {
        return Err(AppError::BadRequest(format!("at most {MAX_BATCH} symbols per request")));
    }

    let quotes = try_join_all(symbols.iter().map(|symbol| state.quotes.quote(symbol))).await?;
    Ok(Json(quotes))
}

/// Placeholder quote with fixed values, kept for frontend development.
pub async fn mock_stock_quote(PathParam(symbol): PathParam<String>) -> Json<MockStockQuote> {
    Json(MockStockQuote::for_symbol(symbol))
}
