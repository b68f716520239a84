//! Integration tests for the Objets storage layer.
//!
//! Every scenario runs against both object backends through
//! `Arc<dyn ObjectBackend>`, the way the protocol front end holds them. The
//! filesystem backend gets a fresh temporary data directory per test.
//!
//! Run them with:
//! ```text
//! cargo test -p objets-integration
//! ```

use std::sync::{Arc, Once};

use objets_core::ObjetsConfig;
use objets_store::{ByteStream, CannedAcl, FsObjectStore, MemoryObjectStore, ObjectBackend};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A backend under test, plus the scratch directory it lives in.
#[derive(Debug)]
pub struct TestBackend {
    /// Backend name for assertion messages.
    pub name: &'static str,
    /// The backend itself.
    pub store: Arc<dyn ObjectBackend>,
    /// Keeps the data directory alive for filesystem backends.
    pub dir: Option<TempDir>,
}

/// Config rooted at `dir`.
#[must_use]
pub fn config_for(dir: &TempDir) -> ObjetsConfig {
    ObjetsConfig::builder()
        .data_dir(dir.path().to_string_lossy().into_owned())
        .build()
}

/// Open a filesystem backend in a fresh temporary directory.
pub async fn fs_backend() -> TestBackend {
    init_tracing();
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let store = FsObjectStore::open(&config_for(&dir))
        .await
        .unwrap_or_else(|e| panic!("open fs store: {e}"));
    TestBackend {
        name: "fs",
        store: Arc::new(store),
        dir: Some(dir),
    }
}

/// An empty in-memory backend.
#[must_use]
pub fn memory_backend() -> TestBackend {
    init_tracing();
    TestBackend {
        name: "memory",
        store: Arc::new(MemoryObjectStore::new()),
        dir: None,
    }
}

/// Both backends, filesystem first.
pub async fn backends() -> Vec<TestBackend> {
    vec![fs_backend().await, memory_backend()]
}

/// Wrap static bytes as an upload body.
#[must_use]
pub fn body(data: &'static [u8]) -> ByteStream {
    Box::pin(data)
}

/// Create `bucket` on `store`.
pub async fn create_bucket(store: &dyn ObjectBackend, bucket: &str) {
    store
        .put_bucket(bucket)
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {bucket}: {e}"));
}

/// Store `data` under `bucket/key` with `acl`.
pub async fn put(
    store: &dyn ObjectBackend,
    bucket: &str,
    key: &str,
    data: &'static [u8],
    acl: CannedAcl,
) {
    store
        .put_object(bucket, key, body(data), acl)
        .await
        .unwrap_or_else(|e| panic!("failed to put {bucket}/{key}: {e}"));
}

/// Read `bucket/key` fully.
pub async fn read(store: &dyn ObjectBackend, bucket: &str, key: &str) -> Vec<u8> {
    store
        .get_object(bucket, key)
        .await
        .unwrap_or_else(|e| panic!("failed to get {bucket}/{key}: {e}"))
        .collect()
        .await
        .unwrap_or_else(|e| panic!("failed to read {bucket}/{key}: {e}"))
}

mod test_acl;
mod test_bucket;
mod test_error;
