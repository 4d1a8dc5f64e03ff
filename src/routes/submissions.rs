use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::Submission;
use crate::query::{self, Criteria, Page};
use crate::state::SharedState;

use super::no_store;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub website: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ListParams {
    /// Filters only; empty strings count as absent.
    fn criteria(&self) -> Result<Criteria, AppError> {
        let start = non_empty(&self.start_date)
            .map(query::parse_start_bound)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let end = non_empty(&self.end_date)
            .map(query::parse_end_bound)
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(Criteria {
            website: non_empty(&self.website).map(str::to_string),
            start,
            end,
            search: non_empty(&self.search).map(str::to_string),
            page: None,
        })
    }

    fn page(&self) -> Page {
        Page::new(
            self.page.unwrap_or(query::DEFAULT_PAGE).max(1),
            self.limit
                .unwrap_or(query::DEFAULT_LIMIT)
                .clamp(1, query::MAX_LIMIT),
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn list(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page();
    let criteria = Criteria {
        page: Some(page),
        ..params.criteria()?
    };

    let result = query::run(state.store.as_ref(), &criteria).await?;

    Ok((
        [no_store()],
        Json(json!({
            "success": true,
            "count": result.records.len(),
            "total": result.total,
            "page": page.page,
            "limit": page.limit,
            "data": result.records,
        })),
    ))
}

pub async fn get(
    State(state): State<SharedState>,
    Path((website, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let submission = state.store.find_by_id(&website, &id).await?;
    Ok(Json(json!({ "success": true, "data": submission })))
}

pub async fn delete(
    State(state): State<SharedState>,
    Path((website, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.delete(&website, &id).await?;

    tracing::info!(website = %website, id = %id, "Submission deleted");

    Ok(Json(json!({ "success": true, "message": "Deleted" })))
}

pub async fn export(
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let criteria = params.criteria()?;
    let result = query::run(state.store.as_ref(), &criteria).await?;

    let filename = format!(
        "attachment; filename=\"{}-submissions-{}.csv\"",
        criteria
            .website
            .as_deref()
            .map(crate::store::sanitize_segment)
            .unwrap_or_else(|| "all".to_string()),
        chrono::Utc::now().format("%Y-%m-%d"),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        export_csv(&result.records),
    ))
}

/// One row per submission; form fields become columns in first-seen order.
pub fn export_csv(submissions: &[Submission]) -> String {
    use std::fmt::Write;
    let mut csv = String::new();

    let mut keys: Vec<&str> = Vec::new();
    for sub in submissions {
        for key in sub.form_data.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    // Header
    let _ = write!(csv, "id,websiteName,websiteUrl,timestamp");
    for key in &keys {
        let _ = write!(csv, ",{}", csv_escape(key));
    }
    let _ = writeln!(csv);

    // Rows
    for sub in submissions {
        let _ = write!(
            csv,
            "{},{},{},{}",
            csv_escape(&sub.id),
            csv_escape(&sub.website_name),
            csv_escape(&sub.website_url),
            sub.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );
        for key in &keys {
            let val = sub
                .form_data
                .get(*key)
                .map(|v| match v {
                    serde_json::Value::String(s) => csv_escape(s),
                    other => csv_escape(&other.to_string()),
                })
                .unwrap_or_default();
            let _ = write!(csv, ",{val}");
        }
        let _ = writeln!(csv);
    }

    csv
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
