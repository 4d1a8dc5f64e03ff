//! Filtering, ordering and pagination of stored submissions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::models::Submission;
use crate::store::{RecordStore, StoreError};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

/// Optional filters. Absent fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    pub website: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: Option<Page>,
}

/// 1-indexed page window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }
    }

    fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub records: Vec<Submission>,
    /// Matching records before pagination.
    pub total: usize,
}

/// Load the candidate set for `criteria.website` and apply the criteria.
pub async fn run(store: &dyn RecordStore, criteria: &Criteria) -> Result<QueryResult, StoreError> {
    let records = store.list(criteria.website.as_deref()).await?;
    Ok(apply(records, criteria))
}

/// Filter (conjunctively), sort newest first, then paginate.
pub fn apply(records: Vec<Submission>, criteria: &Criteria) -> QueryResult {
    let needle = criteria
        .search
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let match_website_name = criteria.website.is_none();

    let mut matched: Vec<Submission> = records
        .into_iter()
        .filter(|s| criteria.start.is_none_or(|start| s.timestamp >= start))
        .filter(|s| criteria.end.is_none_or(|end| s.timestamp <= end))
        .filter(|s| {
            needle
                .as_deref()
                .is_none_or(|needle| matches_search(s, needle, match_website_name))
        })
        .collect();

    matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let total = matched.len();
    let records = match criteria.page {
        Some(page) => matched
            .into_iter()
            .skip(page.offset())
            .take(page.limit)
            .collect(),
        None => matched,
    };

    QueryResult { records, total }
}

/// Substring match over the serialized form data, so a term can span keys,
/// quotes and nesting. `needle` must already be lowercase.
fn matches_search(submission: &Submission, needle: &str, include_website_name: bool) -> bool {
    let serialized = serde_json::to_string(&submission.form_data).unwrap_or_default();
    if serialized.to_lowercase().contains(needle) {
        return true;
    }
    include_website_name && submission.website_name.to_lowercase().contains(needle)
}

/// Parse a lower date bound. A bare date means the start of that day.
pub fn parse_start_bound(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(raw, NaiveTime::MIN)
}

/// Parse an upper date bound. A bare date means the last millisecond of
/// that day, so the whole day is included.
pub fn parse_end_bound(raw: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    parse_bound(raw, end_of_day)
}

fn parse_bound(raw: &str, date_only_time: NaiveTime) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(date_only_time).and_utc());
    }

    Err(format!("Invalid date: {raw}"))
}
