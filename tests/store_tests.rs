mod common;

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;

use common::submission;
use formbox::store::{
    BlobRecordStore, FsRecordStore, InMemoryObjectStore, ObjectStore, RecordStore, StoreError,
    key_stamp, leaf_name, sanitize_segment,
};

struct Backends {
    fs: FsRecordStore,
    blob: BlobRecordStore,
    objects: Arc<InMemoryObjectStore>,
    _dir: tempfile::TempDir,
}

fn backends() -> Backends {
    let dir = tempfile::tempdir().unwrap();
    let objects = Arc::new(InMemoryObjectStore::new());
    Backends {
        fs: FsRecordStore::new(dir.path().join("submissions")),
        blob: BlobRecordStore::new(objects.clone()),
        objects,
        _dir: dir,
    }
}

// ── Key scheme ──────────────────────────────────────────────────

#[test]
fn sanitize_replaces_disallowed_characters() {
    assert_eq!(sanitize_segment("My Site!"), "My_Site_");
    assert_eq!(sanitize_segment("shop.example-1_a"), "shop.example-1_a");
    assert_eq!(sanitize_segment("../etc/passwd"), ".._etc_passwd");
    assert_eq!(sanitize_segment("a/b\\c"), "a_b_c");
}

#[test]
fn sanitize_never_yields_a_relative_directory() {
    assert_eq!(sanitize_segment(".."), "__");
    assert_eq!(sanitize_segment("."), "_");
    assert_eq!(sanitize_segment(""), "_");
}

#[test]
fn sanitize_collisions_are_deterministic() {
    let a = sanitize_segment("site:a");
    let b = sanitize_segment("site?a");
    assert_eq!(a, "site_a");
    assert_eq!(a, b);
    assert_eq!(sanitize_segment("site:a"), a);
}

#[test]
fn leaf_names_sort_by_time() {
    let earlier = submission("s", "zzz", "2024-01-05T09:59:59.999Z", json!({}));
    let later = submission("s", "aaa", "2024-01-05T10:00:00Z", json!({}));

    assert_eq!(key_stamp(&later.timestamp), "2024-01-05T10-00-00.000Z");

    let a = leaf_name(&earlier.timestamp, &earlier.id);
    let b = leaf_name(&later.timestamp, &later.id);
    assert_eq!(b, "2024-01-05T10-00-00.000Z-aaa.json");
    assert!(a < b);
}

// ── Shared behaviour, both backends ─────────────────────────────

async fn put_then_list_round_trips(store: &dyn RecordStore) {
    let sub = submission(
        "siteA",
        "abc123",
        "2024-01-05T10:00:00Z",
        json!({"name": "Ann", "prefs": {"news": true, "tags": ["a", "b"]}}),
    );
    store.put(&sub).await.unwrap();

    let listed = store.list(Some("siteA")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "abc123");
    assert_eq!(listed[0].form_data, sub.form_data);
    assert_eq!(listed[0], sub);
}

async fn list_without_scope_returns_every_website(store: &dyn RecordStore) {
    store
        .put(&submission("siteA", "a1", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();
    store
        .put(&submission("siteB", "b1", "2024-01-05T11:00:00Z", json!({})))
        .await
        .unwrap();

    let mut ids: Vec<String> = store
        .list(None)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    ids.sort();
    assert_eq!(ids, ["a1", "b1"]);

    assert_eq!(store.list(Some("siteB")).await.unwrap().len(), 1);
}

async fn unknown_scope_lists_empty(store: &dyn RecordStore) {
    assert!(store.list(Some("nobody")).await.unwrap().is_empty());
    assert!(store.list(None).await.unwrap().is_empty());
}

async fn identical_timestamps_do_not_collide(store: &dyn RecordStore) {
    for id in ["x1", "x2", "x3"] {
        store
            .put(&submission("siteA", id, "2024-01-05T10:00:00Z", json!({"id": id})))
            .await
            .unwrap();
    }
    assert_eq!(store.list(Some("siteA")).await.unwrap().len(), 3);
}

async fn find_and_delete_by_id(store: &dyn RecordStore) {
    store
        .put(&submission("siteA", "keep", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();
    store
        .put(&submission("siteA", "gone", "2024-01-05T11:00:00Z", json!({"k": 1})))
        .await
        .unwrap();

    let found = store.find_by_id("siteA", "gone").await.unwrap();
    assert_eq!(found.form_data["k"], 1);

    assert!(matches!(
        store.find_by_id("siteB", "gone").await,
        Err(StoreError::NotFound)
    ));
    // Partial ids do not match.
    assert!(matches!(
        store.find_by_id("siteA", "one").await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.find_by_id("siteA", "").await,
        Err(StoreError::NotFound)
    ));

    store.delete("siteA", "gone").await.unwrap();
    assert!(matches!(
        store.delete("siteA", "gone").await,
        Err(StoreError::NotFound)
    ));

    let remaining = store.list(Some("siteA")).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "keep");
}

async fn colliding_names_share_a_scope(store: &dyn RecordStore) {
    store
        .put(&submission("site:a", "c1", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();
    store
        .put(&submission("site?a", "c2", "2024-01-05T11:00:00Z", json!({})))
        .await
        .unwrap();

    let mut via_colon: Vec<String> = store
        .list(Some("site:a"))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    let mut via_question: Vec<String> = store
        .list(Some("site?a"))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    via_colon.sort();
    via_question.sort();

    assert_eq!(via_colon, ["c1", "c2"]);
    assert_eq!(via_colon, via_question);
}

macro_rules! both_backends {
    ($($name:ident),* $(,)?) => {
        mod fs_backend {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    let b = backends();
                    super::$name(&b.fs).await;
                }
            )*
        }

        mod blob_backend {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    let b = backends();
                    super::$name(&b.blob).await;
                }
            )*
        }
    };
}

both_backends!(
    put_then_list_round_trips,
    list_without_scope_returns_every_website,
    unknown_scope_lists_empty,
    identical_timestamps_do_not_collide,
    find_and_delete_by_id,
    colliding_names_share_a_scope,
);

// ── Backend specifics ───────────────────────────────────────────

#[tokio::test]
async fn fs_lays_records_out_per_website() {
    let b = backends();
    let sub = submission("Acme Shop", "abc", "2024-01-05T10:00:00Z", json!({}));
    b.fs.put(&sub).await.unwrap();

    let path = b.fs.record_path(&sub);
    assert_eq!(
        path,
        b.fs.root()
            .join("Acme_Shop")
            .join("2024-01-05T10-00-00.000Z-abc.json")
    );
    assert!(path.exists());

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["websiteName"], "Acme Shop");
    assert_eq!(raw["timestamp"], "2024-01-05T10:00:00Z");
}

#[tokio::test]
async fn fs_skips_corrupt_records() {
    let b = backends();
    b.fs
        .put(&submission("siteA", "ok1", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();
    b.fs
        .put(&submission("siteA", "ok2", "2024-01-05T11:00:00Z", json!({})))
        .await
        .unwrap();

    let dir = b.fs.root().join("siteA");
    std::fs::write(dir.join("2024-01-05T12-00-00.000Z-bad.json"), b"{not json").unwrap();
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

    let mut ids: Vec<String> = b
        .fs
        .list(Some("siteA"))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    ids.sort();
    assert_eq!(ids, ["ok1", "ok2"]);

    assert!(matches!(
        b.fs.find_by_id("siteA", "bad").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn fs_reads_records_written_by_earlier_deployments() {
    let b = backends();
    let dir = b.fs.root().join("legacy");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("2024-01-05T10-00-00.000Z-k3j4h5g6f7d8s9.json"),
        serde_json::to_vec_pretty(&json!({
            "id": "k3j4h5g6f7d8s9",
            "websiteName": "legacy",
            "websiteUrl": "https://legacy.example",
            "timestamp": "2024-01-05T10:00:00.000Z",
            "formData": {"email": "a@b.c"},
            "metadata": {"userAgent": "Mozilla/5.0"}
        }))
        .unwrap(),
    )
    .unwrap();

    let found = b.fs.find_by_id("legacy", "k3j4h5g6f7d8s9").await.unwrap();
    assert_eq!(found.form_data["email"], "a@b.c");
    assert_eq!(
        found.metadata.unwrap().user_agent.as_deref(),
        Some("Mozilla/5.0")
    );
}

#[tokio::test]
async fn blob_uses_prefixed_keys() {
    let b = backends();
    let sub = submission("Acme Shop", "abc", "2024-01-05T10:00:00Z", json!({}));
    b.blob.put(&sub).await.unwrap();

    let keys: Vec<String> = b
        .objects
        .list("submissions/")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.key)
        .collect();
    assert_eq!(keys, ["submissions/Acme_Shop/2024-01-05T10-00-00.000Z-abc.json"]);
    assert_eq!(BlobRecordStore::record_key(&sub), keys[0]);
}

#[tokio::test]
async fn blob_scope_prefix_does_not_leak_into_longer_names() {
    let b = backends();
    b.blob
        .put(&submission("site", "s1", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();
    b.blob
        .put(&submission("site2", "s2", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();

    let listed = b.blob.list(Some("site")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "s1");
}

#[tokio::test]
async fn blob_skips_corrupt_records() {
    let b = backends();
    b.blob
        .put(&submission("siteA", "ok1", "2024-01-05T10:00:00Z", json!({})))
        .await
        .unwrap();
    b.blob
        .put(&submission("siteA", "ok2", "2024-01-05T11:00:00Z", json!({})))
        .await
        .unwrap();
    b.objects
        .put(
            "submissions/siteA/2024-01-05T12-00-00.000Z-bad.json",
            Bytes::from_static(b"\x00\x01garbage"),
        )
        .await
        .unwrap();

    let mut ids: Vec<String> = b
        .blob
        .list(Some("siteA"))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    ids.sort();
    assert_eq!(ids, ["ok1", "ok2"]);
}

#[tokio::test]
async fn fs_failed_write_leaves_no_temp_file() {
    let b = backends();
    let sub = submission("siteA", "blocked", "2024-01-05T10:00:00Z", json!({}));

    // A non-empty directory at the record path makes the final rename fail.
    let path = b.fs.record_path(&sub);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("occupant"), b"x").unwrap();

    assert!(matches!(b.fs.put(&sub).await, Err(StoreError::Io { .. })));

    let leftovers: Vec<String> = std::fs::read_dir(b.fs.root().join("siteA"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}
