//! Live quote lookups against an external market data API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::Config, models::Quote};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("quote provider is not configured")]
    NotConfigured,

    #[error("no quote available for {0}")]
    UnknownSymbol(String),

    #[error("quote provider answered with HTTP {0}")]
    Status(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

pub fn from_config(config: &Config) -> Result<Arc<dyn QuoteProvider>, QuoteError> {
    match &config.quote_api_key {
        Some(key) => Ok(Arc::new(FinnhubQuotes::new(&config.quote_api_url, key)?)),
        None => {
            warn!("QUOTE_API_KEY not set, /api/quote will answer 503");
            Ok(Arc::new(Unconfigured))
        }
    }
}

/// Stand-in used when no API key is configured.
pub struct Unconfigured;

#[async_trait]
impl QuoteProvider for Unconfigured {
    async fn quote(&self, _symbol: &str) -> Result<Quote, QuoteError> {
        Err(QuoteError::NotConfigured)
    }
}

pub struct FinnhubQuotes {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Finnhub `/quote` payload: current, change, percent change, high, low,
/// open, previous close, unix time.
#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: f64,
    d: Option<f64>,
    dp: Option<f64>,
    h: f64,
    l: f64,
    o: f64,
    pc: f64,
    t: i64,
}

impl FinnhubQuotes {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for FinnhubQuotes {
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        debug!(symbol, "fetching quote");
        let response = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let raw: FinnhubQuote = response.json().await?;
        into_quote(symbol, raw)
    }
}

fn into_quote(symbol: &str, raw: FinnhubQuote) -> Result<Quote, QuoteError> {
    // Finnhub answers unknown symbols with an all-zero payload.
    if raw.c == 0.0 && raw.t == 0 {
        return Err(QuoteError::UnknownSymbol(symbol.to_string()));
    }

    Ok(Quote {
        symbol: symbol.to_string(),
        price: raw.c,
        change: raw.d.unwrap_or_default(),
        change_percent: raw.dp.unwrap_or_default(),
        high: raw.h,
        low: raw.l,
        open: raw.o,
        previous_close: raw.pc,
        last_updated: DateTime::from_timestamp(raw.t, 0).unwrap_or_else(Utc::now),
    })
}
