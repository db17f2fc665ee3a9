use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, timestamp};
use crate::db::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

pub const DEFAULT_CONFIDENCE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentRecord {
    pub id: String,
    pub owner_id: String,
    /// Absent for a market-wide call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub sentiment: Sentiment,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record for SentimentRecord {
    const COLLECTION: &'static str = "market_sentiment";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSentiment {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSentiment {
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// `Some(None)` when the field is present as `null`.
    #[serde(default, deserialize_with = "nullable")]
    pub symbol: Option<Option<String>>,
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SentimentQuery {
    pub symbol: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    pub symbol: Option<String>,
    pub total: usize,
    pub bullish: usize,
    pub neutral: usize,
    pub bearish: usize,
    pub average_confidence: f64,
}

impl SentimentSummary {
    pub fn of(symbol: Option<String>, records: &[SentimentRecord]) -> Self {
        let count = |s: Sentiment| records.iter().filter(|r| r.sentiment == s).count();
        let total = records.len();
        let confidence_sum: u32 = records.iter().map(|r| u32::from(r.confidence)).sum();
        let average_confidence = if total == 0 {
            0.0
        } else {
            f64::from(confidence_sum) / total as f64
        };

        Self {
            symbol,
            total,
            bullish: count(Sentiment::Bullish),
            neutral: count(Sentiment::Neutral),
            bearish: count(Sentiment::Bearish),
            average_confidence,
        }
    }
}
