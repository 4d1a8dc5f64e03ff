use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::models::Submission;

use super::{RecordStore, StoreError, decode, encode, leaf_matches_id, leaf_name, sanitize_segment};

/// Directory tree backend: `<root>/<website>/<stamp>-<id>.json`.
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a submission is written to.
    pub fn record_path(&self, submission: &Submission) -> PathBuf {
        self.root
            .join(sanitize_segment(&submission.website_name))
            .join(leaf_name(&submission.timestamp, &submission.id))
    }

    async fn ensure_root(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            StoreError::io(format!("failed to create {}", self.root.display()), e)
        })
    }

    async fn website_dirs(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            StoreError::io(format!("failed to read {}", self.root.display()), e)
        })?;

        let mut dirs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(format!("failed to read {}", self.root.display()), e))?
        {
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => dirs.push(entry.path()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping {}: {e}", entry.path().display());
                }
            }
        }
        Ok(dirs)
    }

    /// Record file names in one website directory. Missing directory is empty.
    async fn record_files(&self, dir: &Path) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::io(format!("failed to read {}", dir.display()), e));
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(format!("failed to read {}", dir.display()), e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(".json") && !name.starts_with('.') {
                files.push(name);
            }
        }
        Ok(files)
    }

    async fn read_record(path: &Path) -> Option<Submission> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Error reading submission file {}: {e}", path.display());
                return None;
            }
        };
        match decode(&bytes) {
            Ok(submission) => Some(submission),
            Err(e) => {
                tracing::warn!("Error parsing submission file {}: {e}", path.display());
                None
            }
        }
    }

    async fn find_path(&self, scope: &str, id: &str) -> Result<PathBuf, StoreError> {
        let dir = self.root.join(sanitize_segment(scope));
        let mut files = self.record_files(&dir).await?;
        files.sort();
        files
            .into_iter()
            .find(|name| leaf_matches_id(name, id))
            .map(|name| dir.join(name))
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn put(&self, submission: &Submission) -> Result<(), StoreError> {
        let path = self.record_path(submission);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(format!("failed to create {}", dir.display()), e))?;

        let bytes = encode(submission)?;

        // Write under a hidden name first; listings skip dotfiles.
        let leaf = leaf_name(&submission.timestamp, &submission.id);
        let tmp = dir.join(format!(".{leaf}.tmp"));

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| StoreError::io(format!("failed to create {}", tmp.display()), e))?;

        let published = async {
            file.write_all(&bytes)
                .await
                .map_err(|e| StoreError::io(format!("failed to write {}", tmp.display()), e))?;
            file.sync_all()
                .await
                .map_err(|e| StoreError::io(format!("failed to sync {}", tmp.display()), e))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .map_err(|e| StoreError::io(format!("failed to move {}", path.display()), e))
        }
        .await;
        drop(file);

        if published.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!("Error removing temp file {}: {e}", tmp.display());
            }
        }
        published
    }

    async fn list(&self, scope: Option<&str>) -> Result<Vec<Submission>, StoreError> {
        self.ensure_root().await?;

        let dirs = match scope {
            Some(scope) => vec![self.root.join(sanitize_segment(scope))],
            None => self.website_dirs().await?,
        };

        let mut submissions = Vec::new();
        for dir in dirs {
            for name in self.record_files(&dir).await? {
                if let Some(submission) = Self::read_record(&dir.join(&name)).await {
                    submissions.push(submission);
                }
            }
        }
        Ok(submissions)
    }

    async fn find_by_id(&self, scope: &str, id: &str) -> Result<Submission, StoreError> {
        let path = self.find_path(scope, id).await?;
        Self::read_record(&path).await.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, scope: &str, id: &str) -> Result<(), StoreError> {
        let path = self.find_path(scope, id).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::io(
                format!("failed to remove {}", path.display()),
                e,
            )),
        }
    }
}
