//! The capability interface consumed by the protocol front end.
//!
//! [`ObjectBackend`] uses `#[async_trait]` so it stays object safe and can be
//! shared as `Arc<dyn ObjectBackend>`. [`crate::FsObjectStore`] is the
//! production implementation; [`crate::MemoryObjectStore`] substitutes for it
//! in tests.
//!
//! Per-object state machine: absent -> `put_object` -> present ->
//! `put_object_acl` -> present -> `delete_object` -> absent. `get_object` and
//! `stat_object` never change state.

use std::fmt;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{Bucket, ByteStream, CannedAcl, GetObjectOutput, ListBucketResult, ObjectStat};

/// Bucket and object lifecycle operations.
///
/// Every operation taking a bucket, key, or prefix checks it with
/// [`crate::path`] before touching any storage and fails with
/// [`crate::StoreError::InvalidPath`] without side effects.
#[async_trait]
pub trait ObjectBackend: Send + Sync + fmt::Debug {
    /// Create a bucket. Creating an existing bucket succeeds.
    async fn put_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Delete a bucket, its objects, and all of their ACL entries.
    ///
    /// Fails with [`crate::StoreError::NoSuchBucket`] if it does not exist.
    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// All buckets, sorted by name.
    async fn buckets(&self) -> StoreResult<Vec<Bucket>>;

    /// Immediate children of `bucket/prefix`.
    ///
    /// Fails with [`crate::StoreError::NoSuchBucket`] if the bucket or the
    /// prefix directory does not exist.
    async fn list_bucket(&self, bucket: &str, prefix: &str) -> StoreResult<ListBucketResult>;

    /// Whether the object exists, with the outcome of its ACL lookup.
    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStat>;

    /// Open an object for reading.
    ///
    /// Fails with [`crate::StoreError::NoSuchKey`] if it does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<GetObjectOutput>;

    /// Store an object and its ACL, replacing any previous version.
    ///
    /// Returns the number of bytes written. The bytes are durable before the
    /// ACL is recorded.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        acl: CannedAcl,
    ) -> StoreResult<u64>;

    /// Delete an object: its ACL entry first, then its bytes.
    ///
    /// Deleting a missing object succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// Replace the ACL of an existing object.
    ///
    /// Fails with [`crate::StoreError::NoSuchKey`] if the object does not
    /// exist, leaving the ACL store untouched.
    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()>;

    /// Release storage handles. Called once at shutdown.
    async fn close(&self) -> StoreResult<()>;
}
