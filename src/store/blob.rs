use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::models::Submission;

use super::{
    ObjectStore, RecordStore, StoreError, decode, encode, leaf_matches_id, leaf_name,
    sanitize_segment,
};

const ROOT_PREFIX: &str = "submissions/";

/// Flat object storage backend: `submissions/<website>/<stamp>-<id>.json`.
pub struct BlobRecordStore {
    objects: Arc<dyn ObjectStore>,
}

impl BlobRecordStore {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    pub fn record_key(submission: &Submission) -> String {
        format!(
            "{ROOT_PREFIX}{}/{}",
            sanitize_segment(&submission.website_name),
            leaf_name(&submission.timestamp, &submission.id)
        )
    }

    fn scope_prefix(scope: &str) -> String {
        format!("{ROOT_PREFIX}{}/", sanitize_segment(scope))
    }

    async fn read_record(&self, key: &str) -> Option<Submission> {
        let bytes = match self.objects.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!("Submission blob {key} vanished during read");
                return None;
            }
            Err(e) => {
                tracing::warn!("Error fetching submission blob {key}: {e}");
                return None;
            }
        };
        match decode(&bytes) {
            Ok(submission) => Some(submission),
            Err(e) => {
                tracing::warn!("Error parsing submission blob {key}: {e}");
                None
            }
        }
    }

    async fn find_key(&self, scope: &str, id: &str) -> Result<String, StoreError> {
        let mut keys: Vec<String> = self
            .objects
            .list(&Self::scope_prefix(scope))
            .await?
            .into_iter()
            .map(|meta| meta.key)
            .collect();
        keys.sort();
        keys.into_iter()
            .find(|key| {
                let leaf = key.rsplit('/').next().unwrap_or(key);
                leaf_matches_id(leaf, id)
            })
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl RecordStore for BlobRecordStore {
    async fn put(&self, submission: &Submission) -> Result<(), StoreError> {
        let body = encode(submission)?;
        self.objects
            .put(&Self::record_key(submission), Bytes::from(body))
            .await
    }

    async fn list(&self, scope: Option<&str>) -> Result<Vec<Submission>, StoreError> {
        let prefix = match scope {
            Some(scope) => Self::scope_prefix(scope),
            None => ROOT_PREFIX.to_string(),
        };

        let listed = self.objects.list(&prefix).await?;

        let mut submissions = Vec::with_capacity(listed.len());
        for meta in listed {
            if !meta.key.ends_with(".json") {
                continue;
            }
            if let Some(submission) = self.read_record(&meta.key).await {
                submissions.push(submission);
            }
        }
        Ok(submissions)
    }

    async fn find_by_id(&self, scope: &str, id: &str) -> Result<Submission, StoreError> {
        let key = self.find_key(scope, id).await?;
        self.read_record(&key).await.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, scope: &str, id: &str) -> Result<(), StoreError> {
        let key = self.find_key(scope, id).await?;
        if self.objects.delete(&key).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}
