use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::db::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackCategory {
    Bug,
    Feature,
    #[default]
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub category: FeedbackCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Record for FeedbackEntry {
    const COLLECTION: &'static str = "feedback";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedback {
    pub message: String,
    #[serde(default)]
    pub category: FeedbackCategory,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub contact_email: Option<String>,
}
