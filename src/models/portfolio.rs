use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::db::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub id: String,
    pub owner_id: String,
    pub symbol: String,
    pub shares: Decimal,
    pub average_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record for PortfolioEntry {
    const COLLECTION: &'static str = "portfolios";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortfolioEntry {
    pub symbol: String,
    pub shares: Decimal,
    #[serde(default)]
    pub average_cost: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortfolioEntry {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub shares: Option<Decimal>,
    #[serde(default)]
    pub average_cost: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub positions: usize,
    pub total_shares: Decimal,
    pub total_cost: Decimal,
}

impl PortfolioSummary {
    /// Totals over `entries`, or `None` when they do not fit a `Decimal`.
    pub fn of(entries: &[PortfolioEntry]) -> Option<Self> {
        let mut total_shares = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;
        for entry in entries {
            total_shares = total_shares.checked_add(entry.shares)?;
            total_cost = total_cost.checked_add(entry.shares.checked_mul(entry.average_cost)?)?;
        }

        Some(Self {
            positions: entries.len(),
            total_shares,
            total_cost,
        })
    }
}
