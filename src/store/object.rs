use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
}

/// Flat key-value blob storage. Keys are `/`-separated paths; there are no
/// real directories, a "directory" is just a shared key prefix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError>;

    /// `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;

    /// `Ok(false)` when the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.objects.write().await.insert(key.to_string(), body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, body)| ObjectMeta {
                key: key.clone(),
                size: body.len() as u64,
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.objects.write().await.remove(key).is_some())
    }
}

/// Client for a blob gateway.
///
/// Objects live at `{base}/{key}` (`PUT`, `GET`, `DELETE`, bearer auth).
/// `GET {base}?prefix=..&cursor=..` lists one page:
/// `{"blobs": [{"pathname", "size"}], "cursor", "hasMore"}`.
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    blobs: Vec<ListedBlob>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Deserialize)]
struct ListedBlob {
    pathname: String,
    #[serde(default)]
    size: u64,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, token: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to build blob client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    fn list_url(&self, prefix: &str, cursor: Option<&str>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("prefix", prefix);
        if let Some(cursor) = cursor {
            query.append_pair("cursor", cursor);
        }
        format!("{}?{}", self.base_url, query.finish())
    }
}

fn backend_err(action: &str, key: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{action} {key}: {err}"))
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(self.object_url(key))
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| backend_err("put", key, e))?;

        if !resp.status().is_success() {
            return Err(backend_err("put", key, resp.status()));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let resp = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| backend_err("get", key, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp
                .bytes()
                .await
                .map(Some)
                .map_err(|e| backend_err("get", key, e)),
            status => Err(backend_err("get", key, status)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let resp = self
                .client
                .get(self.list_url(prefix, cursor.as_deref()))
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| backend_err("list", prefix, e))?;

            if !resp.status().is_success() {
                return Err(backend_err("list", prefix, resp.status()));
            }

            let page: ListPage = resp
                .json()
                .await
                .map_err(|e| backend_err("list", prefix, e))?;

            objects.extend(page.blobs.into_iter().map(|b| ObjectMeta {
                key: b.pathname,
                size: b.size,
            }));

            match (page.has_more, page.cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let resp = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| backend_err("delete", key, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(backend_err("delete", key, status)),
        }
    }
}
