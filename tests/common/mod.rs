#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;

use formbox::config::{Config, IdScheme, StorageConfig};
use formbox::ids::IdGenerator;
use formbox::models::Submission;
use formbox::store::{FsRecordStore, RecordStore};

/// Deterministic ids: `id-0001`, `id-0002`, ...
pub struct SequentialIds {
    next: AtomicUsize,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self {
            next: AtomicUsize::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        format!("id-{:04}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// A running test server backed by a temporary directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<FsRecordStore>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Submit a JSON body to the collector, return (body, status).
    pub async fn submit_json(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/submit"))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit form-urlencoded data to the collector, return (body, status).
    pub async fn submit_form(&self, data: &[(&str, &str)]) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/submit"))
            .form(data)
            .send()
            .await
            .expect("submit form failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Write a record straight to the store with a chosen timestamp.
    pub async fn seed(&self, website: &str, id: &str, ts: &str, form_data: Value) -> Submission {
        let submission = submission(website, id, ts, form_data);
        self.store.put(&submission).await.expect("seed put failed");
        submission
    }
}

pub fn test_config(root: &std::path::Path) -> Config {
    Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        storage: StorageConfig::Filesystem {
            root: root.to_path_buf(),
        },
        id_scheme: IdScheme::Uuid,
        max_body_size: 64 * 1024,
        trusted_proxies: vec![],
        log_level: "warn".to_string(),
        smtp: None,
        notify_email: None,
    }
}

/// Spawn the app on a random port over a fresh temporary directory.
pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path().join("submissions");
    let store = Arc::new(FsRecordStore::new(&root));

    let app = formbox::build_app(
        store.clone(),
        Arc::new(SequentialIds::new()),
        test_config(&root),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        store,
        dir,
    }
}

pub fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("bad test timestamp")
        .with_timezone(&Utc)
}

pub fn submission(website: &str, id: &str, timestamp: &str, form_data: Value) -> Submission {
    Submission {
        id: id.to_string(),
        website_name: website.to_string(),
        website_url: format!("https://{website}.example"),
        timestamp: ts(timestamp),
        form_data: form_data.as_object().cloned().unwrap_or_default(),
        metadata: None,
    }
}
