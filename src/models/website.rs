use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-website summary derived from stored submissions. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub name: String,
    pub url: String,
    pub submission_count: usize,
    pub last_submission: DateTime<Utc>,
}
