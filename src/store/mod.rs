//! Durable persistence of submissions.
//!
//! Every backend lays records out the same way: one record per key, the
//! website name as a grouping segment and `<stamp>-<id>.json` as the leaf.
//! Listing a website is a prefix scan and leaf names sort by time.

pub mod blob;
pub mod fs;
pub mod object;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::StorageConfig;
use crate::models::Submission;

pub use blob::BlobRecordStore;
pub use fs::FsRecordStore;
pub use object::{HttpObjectStore, InMemoryObjectStore, ObjectMeta, ObjectStore};

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Io {
        context: String,
        source: std::io::Error,
    },
    Encode(serde_json::Error),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Io { context, source } => write!(f, "{context}: {source}"),
            StoreError::Encode(err) => write!(f, "failed to encode record: {err}"),
            StoreError::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Keyed persistence of submissions, scoped by website.
///
/// `list` must skip (and log) individual records that cannot be read; only
/// a failure of the enumeration itself is an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, submission: &Submission) -> Result<(), StoreError>;

    /// All records of `scope`, or of every website when `scope` is `None`.
    /// Order is unspecified.
    async fn list(&self, scope: Option<&str>) -> Result<Vec<Submission>, StoreError>;

    async fn find_by_id(&self, scope: &str, id: &str) -> Result<Submission, StoreError>;

    async fn delete(&self, scope: &str, id: &str) -> Result<(), StoreError>;
}

/// Build the backend selected by configuration.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, String> {
    let store: Arc<dyn RecordStore> = match config {
        StorageConfig::Filesystem { root } => {
            tracing::info!("Using filesystem record store at {}", root.display());
            Arc::new(FsRecordStore::new(root.clone()))
        }
        StorageConfig::Blob { base_url, token } => {
            tracing::info!("Using blob record store at {base_url}");
            let objects = HttpObjectStore::new(base_url, token)?;
            Arc::new(BlobRecordStore::new(Arc::new(objects)))
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory record store; submissions are lost on restart");
            Arc::new(BlobRecordStore::new(Arc::new(InMemoryObjectStore::new())))
        }
    };
    Ok(store)
}

/// Map a raw website name onto a safe key segment.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`. A segment made only of
/// dots would address the current or parent directory, so its dots are
/// replaced too. Distinct names can collide (`a:b` and `a?b` both give
/// `a_b`); records of colliding names share one scope.
pub fn sanitize_segment(name: &str) -> String {
    let mut segment: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if segment.is_empty() || segment.chars().all(|c| c == '.') {
        segment = "_".repeat(segment.len().max(1));
    }
    segment
}

/// Leaf name of a record: `<stamp>-<id>.json`.
pub fn leaf_name(timestamp: &DateTime<Utc>, id: &str) -> String {
    format!("{}-{id}.json", key_stamp(timestamp))
}

/// Timestamp rendered without colons so it is valid in any path segment.
/// Fixed width, so lexical order matches time order.
pub fn key_stamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string()
}

/// Whether `leaf` is the record file for `id`.
pub(crate) fn leaf_matches_id(leaf: &str, id: &str) -> bool {
    !id.is_empty()
        && leaf
            .strip_suffix(".json")
            .and_then(|stem| stem.strip_suffix(id))
            .is_some_and(|rest| rest.ends_with('-'))
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Submission, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub(crate) fn encode(submission: &Submission) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(submission).map_err(StoreError::Encode)
}
