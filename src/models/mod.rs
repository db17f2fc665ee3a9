mod feedback;
mod market_sentiment;
mod portfolio;
mod quote;
mod user;

pub use feedback::*;
pub use market_sentiment::*;
pub use portfolio::*;
pub use quote::*;
pub use user::*;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

pub const MAX_NOTE_LEN: usize = 1000;

/// Current time at the precision documents are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Fixed-width RFC 3339 timestamps, so string order is time order in the store.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

/// Keeps an explicit `null` apart from a missing field; pair with
/// `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Upper-cases a ticker symbol and checks it looks like one.
pub fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid = (1..=12).contains(&symbol.len())
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if valid {
        Ok(symbol)
    } else {
        Err(AppError::BadRequest(format!("Invalid stock symbol: {raw:?}")))
    }
}

/// Trims an optional free-text field, dropping it when empty.
pub fn normalize_note(note: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    match note {
        Some(n) if n.chars().count() > MAX_NOTE_LEN => Err(AppError::BadRequest(format!(
            "{field} must be at most {MAX_NOTE_LEN} characters"
        ))),
        other => Ok(other),
    }
}
