//! Per-website summaries, recomputed from the full record population on
//! every call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Submission, Website};
use crate::store::{RecordStore, StoreError};

struct Tally<'a> {
    count: usize,
    latest: DateTime<Utc>,
    url: &'a str,
}

/// Scan every stored record and summarize it per website.
pub async fn websites(store: &dyn RecordStore) -> Result<Vec<Website>, StoreError> {
    let records = store.list(None).await?;
    Ok(summarize(&records))
}

/// Fold records into one summary per website name, newest activity first.
///
/// The summary's url is the one carried by the website's latest submission.
pub fn summarize(records: &[Submission]) -> Vec<Website> {
    let mut tallies: HashMap<&str, Tally<'_>> = HashMap::new();

    for record in records {
        tallies
            .entry(record.website_name.as_str())
            .and_modify(|tally| {
                tally.count += 1;
                if record.timestamp > tally.latest {
                    tally.latest = record.timestamp;
                    tally.url = &record.website_url;
                }
            })
            .or_insert(Tally {
                count: 1,
                latest: record.timestamp,
                url: &record.website_url,
            });
    }

    let mut websites: Vec<Website> = tallies
        .into_iter()
        .map(|(name, tally)| Website {
            name: name.to_string(),
            url: tally.url.to_string(),
            submission_count: tally.count,
            last_submission: tally.latest,
        })
        .collect();

    websites.sort_by(|a, b| {
        b.last_submission
            .cmp(&a.last_submission)
            .then_with(|| a.name.cmp(&b.name))
    });
    websites
}
