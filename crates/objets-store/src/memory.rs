//! In-memory object backend.
//!
//! [`MemoryObjectStore`] keeps buckets in a [`DashMap`] and each bucket's
//! objects in a sorted map, with the ACL stored next to the bytes. It follows
//! the same validation and error rules as [`crate::FsObjectStore`] and is
//! meant for tests of code written against [`ObjectBackend`].
//!
//! Keys are flat strings here, so `a` and `a/b` may both exist; the
//! filesystem backend cannot hold a file and a directory under one name.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::backend::ObjectBackend;
use crate::error::{StoreError, StoreResult};
use crate::path::{check_bucket, check_key, check_prefix};
use crate::types::{
    Bucket, ByteStream, CannedAcl, CommonPrefix, GetObjectOutput, ListBucketResult, ObjectStat,
    ObjectSummary,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
    acl: CannedAcl,
}

#[derive(Debug)]
struct MemoryBucket {
    created: DateTime<Utc>,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBucket {
    fn new() -> Self {
        Self {
            created: Utc::now(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }
}

/// Object backend holding everything in memory.
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: DashMap<String, MemoryBucket>,
}

impl std::fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObjectStore")
            .field("buckets", &self.buckets.len())
            .field("objects", &self.object_count())
            .finish()
    }
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of objects across all buckets.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.objects.read().len())
            .sum()
    }

    fn no_such_bucket(bucket: &str) -> StoreError {
        StoreError::NoSuchBucket {
            bucket: bucket.to_owned(),
        }
    }

    fn no_such_key(bucket: &str, key: &str) -> StoreError {
        StoreError::NoSuchKey {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        }
    }

    /// Run `f` against a bucket's objects.
    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&MemoryBucket) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        f(&entry)
    }
}

#[async_trait]
impl ObjectBackend for MemoryObjectStore {
    async fn put_bucket(&self, bucket: &str) -> StoreResult<()> {
        check_bucket(bucket)?;
        self.buckets
            .entry(bucket.to_owned())
            .or_insert_with(MemoryBucket::new);
        debug!(bucket, "created bucket");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        check_bucket(bucket)?;
        let (_, removed) = self
            .buckets
            .remove(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        debug!(bucket, objects = removed.objects.read().len(), "deleted bucket");
        Ok(())
    }

    async fn buckets(&self) -> StoreResult<Vec<Bucket>> {
        let mut buckets: Vec<Bucket> = self
            .buckets
            .iter()
            .map(|entry| Bucket {
                name: entry.key().clone(),
                creation_date: entry.created,
            })
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn list_bucket(&self, bucket: &str, prefix: &str) -> StoreResult<ListBucketResult> {
        check_bucket(bucket)?;
        check_prefix(prefix)?;

        let dir = match prefix.strip_suffix('/').unwrap_or(prefix) {
            "" => String::new(),
            trimmed => format!("{trimmed}/"),
        };

        self.with_bucket(bucket, |b| {
            let objects = b.objects.read();
            let mut result = ListBucketResult::default();

            let range = objects.range::<str, _>((Bound::Included(dir.as_str()), Bound::Unbounded));
            for (key, object) in range {
                let Some(rest) = key.strip_prefix(dir.as_str()) else {
                    break;
                };
                match rest.split_once('/') {
                    Some((child, _)) => {
                        let prefix = format!("{dir}{child}/");
                        if result.common_prefixes.last().map(|p| &p.prefix) != Some(&prefix) {
                            result.common_prefixes.push(CommonPrefix { prefix });
                        }
                    }
                    None => result.contents.push(ObjectSummary {
                        key: key.clone(),
                        size: object.data.len() as u64,
                        last_modified: object.last_modified,
                    }),
                }
            }

            // A prefix with nothing beneath it has no directory to list.
            if !dir.is_empty() && result.contents.is_empty() && result.common_prefixes.is_empty() {
                return Err(Self::no_such_bucket(bucket));
            }
            Ok(result)
        })
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStat> {
        check_bucket(bucket)?;
        check_key(key)?;

        let Some(entry) = self.buckets.get(bucket) else {
            return Ok(ObjectStat::Missing);
        };
        let stat = match entry.objects.read().get(key) {
            Some(object) => ObjectStat::Present {
                acl: Ok(object.acl),
            },
            None => ObjectStat::Missing,
        };
        Ok(stat)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<GetObjectOutput> {
        check_bucket(bucket)?;
        check_key(key)?;

        let object = self
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.read().get(key).cloned())
            .ok_or_else(|| Self::no_such_key(bucket, key))?;

        trace!(bucket, key, size = object.data.len(), "read object from memory");
        Ok(GetObjectOutput {
            size: object.data.len() as u64,
            last_modified: object.last_modified,
            acl: object.acl,
            body: Box::pin(std::io::Cursor::new(object.data)),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ByteStream,
        acl: CannedAcl,
    ) -> StoreResult<u64> {
        check_bucket(bucket)?;
        check_key(key)?;
        if !self.buckets.contains_key(bucket) {
            return Err(Self::no_such_bucket(bucket));
        }

        let mut buf = BytesMut::new();
        while body.read_buf(&mut buf).await? > 0 {}
        let data = buf.freeze();
        let size = data.len() as u64;

        self.with_bucket(bucket, |b| {
            b.objects.write().insert(
                key.to_owned(),
                StoredObject {
                    data,
                    last_modified: Utc::now(),
                    acl,
                },
            );
            Ok(())
        })?;

        debug!(bucket, key, size, %acl, "stored object in memory");
        Ok(size)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        check_bucket(bucket)?;
        check_key(key)?;
        self.with_bucket(bucket, |b| {
            if b.objects.write().remove(key).is_some() {
                debug!(bucket, key, "deleted object from memory");
            }
            Ok(())
        })
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()> {
        check_bucket(bucket)?;
        check_key(key)?;

        let entry = self
            .buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_key(bucket, key))?;
        let mut objects = entry.objects.write();
        let object = objects
            .get_mut(key)
            .ok_or_else(|| Self::no_such_key(bucket, key))?;
        object.acl = acl;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        debug!(buckets = self.buckets.len(), "closed memory object store");
        Ok(())
    }
}
