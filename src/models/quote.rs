use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub last_updated: DateTime<Utc>,
}

/// Fixed response of the placeholder `/api/stocks/quote/:symbol` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockStockQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub last_updated: DateTime<Utc>,
}

impl MockStockQuote {
    pub fn for_symbol(symbol: String) -> Self {
        Self {
            symbol,
            price: 150.00,
            change: 2.50,
            change_percent: 1.67,
            volume: 1_000_000,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    pub symbols: Option<String>,
}
