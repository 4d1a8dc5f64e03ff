use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::{DateTime, TimeDelta, Utc};

use crate::models::Submission;
use crate::state::SharedState;
use crate::store::StoreError;

use super::fields::SubmitFields;
use super::metadata;

/// Stamp, persist and announce a validated submission.
///
/// The record is acknowledged only once the store has accepted it; the
/// email notice is sent afterwards and its failure is only logged.
pub async fn run(
    state: &SharedState,
    headers: &HeaderMap,
    peer_addr: Option<IpAddr>,
    fields: SubmitFields,
) -> Result<Submission, StoreError> {
    let submission = Submission {
        id: state.ids.next_id(),
        website_name: fields.website_name,
        website_url: fields.website_url,
        timestamp: now_millis(),
        form_data: fields.form_data,
        metadata: Some(metadata::extract(
            headers,
            peer_addr,
            &state.config.trusted_proxies,
        )),
    };

    state.store.put(&submission).await?;

    tracing::info!(
        website = %submission.website_name,
        id = %submission.id,
        "Submission stored"
    );

    if let Some(notifier) = state.notifier.clone() {
        let record = submission.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&record).await {
                tracing::error!("Failed to send notification for {}: {e}", record.id);
            }
        });
    }

    Ok(submission)
}

/// Current time truncated to the millisecond precision kept in records.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    let excess = TimeDelta::nanoseconds(i64::from(now.timestamp_subsec_nanos() % 1_000_000));
    now - excess
}
