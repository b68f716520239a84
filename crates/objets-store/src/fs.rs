//! Filesystem-backed object store.
//!
//! Layout: `<root>/<bucket>/<key segments...>` holds object bytes, and the
//! [`AclStore`] holds one entry per object.
//!
//! # Ordering
//!
//! The filesystem and the ACL store are updated by separate calls, so the
//! pair is not atomic. Operations are ordered so that a crash between the two
//! steps leaves an object without an ACL (read back as
//! [`CannedAcl::Private`]) and never an ACL without an object:
//!
//! - `put_object`: write temp file, fsync, rename into place, then set ACL.
//! - `delete_object`: remove ACL, then remove file.
//! - `delete_bucket`: remove all ACLs of the bucket in one transaction, then
//!   remove the directory tree.
//!
//! Uploads go through a temporary file in the target directory that is
//! renamed over the key, so concurrent readers see either the old or the new
//! content in full.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use objets_core::ObjetsConfig;
use tokio::fs;
use tracing::{debug, info, trace, warn};

use crate::acl::AclStore;
use crate::backend::ObjectBackend;
use crate::error::{AclError, StoreError, StoreResult};
use crate::path::{self, TEMP_PREFIX, check_bucket, check_key, check_prefix, join_key};
use crate::types::{
    Bucket, ByteStream, CannedAcl, CommonPrefix, GetObjectOutput, ListBucketResult, ObjectStat,
    ObjectSummary, to_utc,
};

/// Object store keeping bytes on the local filesystem.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use objets_store::acl::AclStore;
/// use objets_store::types::CannedAcl;
/// use objets_store::{FsObjectStore, ObjectBackend};
///
/// # tokio_test::block_on(async {
/// let dir = tempfile::tempdir().unwrap();
/// let acl = Arc::new(AclStore::open(dir.path().join("acl.db")).unwrap());
/// let store = FsObjectStore::new(dir.path().join("buckets"), acl);
///
/// store.put_bucket("imgs").await.unwrap();
/// let body = Box::pin(&b"0123456789"[..]);
/// store.put_object("imgs", "a/b.png", body, CannedAcl::PublicRead).await.unwrap();
///
/// let object = store.get_object("imgs", "a/b.png").await.unwrap();
/// assert_eq!(object.acl, CannedAcl::PublicRead);
/// assert_eq!(object.collect().await.unwrap(), b"0123456789");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    /// Directory holding one subdirectory per bucket.
    root: PathBuf,
    /// ACL entries, shared with anything else holding the store.
    acl: Arc<AclStore>,
}

impl FsObjectStore {
    /// Create a store over an existing root directory and ACL store.
    pub fn new(root: impl Into<PathBuf>, acl: Arc<AclStore>) -> Self {
        Self {
            root: root.into(),
            acl,
        }
    }

    /// Open the store described by `config`, creating the bucket root and the
    /// ACL database as needed.
    pub async fn open(config: &ObjetsConfig) -> StoreResult<Self> {
        let root = config.buckets_dir();
        fs::create_dir_all(&root).await?;
        let acl = AclStore::open(config.acl_db_path())?;
        info!(root = %root.display(), "opened filesystem object store");
        Ok(Self::new(root, Arc::new(acl)))
    }

    /// Directory holding the buckets.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The ACL store backing this object store.
    #[must_use]
    pub fn acl(&self) -> &AclStore {
        &self.acl
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        path::resolve(&self.bucket_path(bucket), key)
    }

    /// Return the bucket directory, or `NoSuchBucket` if it is missing.
    async fn require_bucket(&self, bucket: &str) -> StoreResult<PathBuf> {
        let dir = self.bucket_path(bucket);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(no_such_bucket(bucket)),
            Err(e) if is_not_found(&e) => Err(no_such_bucket(bucket)),
            Err(e) => Err(e.into()),
        }
    }

    /// Every object key under a bucket directory, sorted.
    async fn object_keys(bucket_dir: &Path) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(bucket_dir.to_path_buf(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry_name(&entry) else {
                    continue;
                };
                if name.starts_with(TEMP_PREFIX) {
                    continue;
                }
                let key = join_key(&prefix, &name);
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), key));
                } else {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectBackend for FsObjectStore {
    async fn put_bucket(&self, bucket: &str) -> StoreResult<()> {
        check_bucket(bucket)?;
        fs::create_dir_all(self.bucket_path(bucket)).await?;
        debug!(bucket, "created bucket");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        check_bucket(bucket)?;
        let dir = self.require_bucket(bucket).await?;

        let keys = Self::object_keys(&dir).await?;
        let removed = self.acl.remove_bucket(bucket, &keys)?;
        fs::remove_dir_all(&dir).await?;

        info!(
            bucket,
            objects = keys.len(),
            acl_entries = removed,
            "deleted bucket"
        );
        Ok(())
    }

    async fn buckets(&self) -> StoreResult<Vec<Bucket>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::StorageRootNotFound {
                    path: self.root.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry_name(&entry) else {
                continue;
            };
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if is_not_found(&e) => continue,
                Err(e) => return Err(e.into()),
            };
            if !meta.is_dir() {
                continue;
            }
            buckets.push(Bucket {
                name,
                creation_date: to_utc(meta.modified()?),
            });
        }

        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        trace!(count = buckets.len(), "listed buckets");
        Ok(buckets)
    }

    async fn list_bucket(&self, bucket: &str, prefix: &str) -> StoreResult<ListBucketResult> {
        check_bucket(bucket)?;
        check_prefix(prefix)?;

        let dir = path::resolve(&self.bucket_path(bucket), prefix);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if is_not_found(&e) => return Err(no_such_bucket(bucket)),
            Err(e) => return Err(e.into()),
        };

        let mut result = ListBucketResult::default();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry_name(&entry) else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if is_not_found(&e) => continue,
                Err(e) => return Err(e.into()),
            };

            let key = join_key(prefix, &name);
            if meta.is_dir() {
                result.common_prefixes.push(CommonPrefix {
                    prefix: format!("{key}/"),
                });
            } else if meta.is_file() {
                result.contents.push(ObjectSummary {
                    key,
                    size: meta.len(),
                    last_modified: to_utc(meta.modified()?),
                });
            }
        }

        result.contents.sort_by(|a, b| a.key.cmp(&b.key));
        result.common_prefixes.sort();

        debug!(
            bucket,
            prefix,
            contents = result.contents.len(),
            common_prefixes = result.common_prefixes.len(),
            "listed bucket"
        );
        Ok(result)
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStat> {
        check_bucket(bucket)?;
        check_key(key)?;

        match fs::metadata(self.object_path(bucket, key)).await {
            Ok(meta) if meta.is_file() => {
                let acl = self.acl.get(bucket, key);
                if let Err(e) = &acl {
                    warn!(bucket, key, error = %e, "object exists but its ACL lookup failed");
                }
                Ok(ObjectStat::Present { acl })
            }
            Ok(_) => Ok(ObjectStat::Missing),
            Err(e) if is_not_found(&e) => Ok(ObjectStat::Missing),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<GetObjectOutput> {
        check_bucket(bucket)?;
        check_key(key)?;

        let file = match fs::File::open(self.object_path(bucket, key)).await {
            Ok(file) => file,
            Err(e) if is_not_found(&e) => return Err(no_such_key(bucket, key)),
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(no_such_key(bucket, key));
        }

        let acl = match self.acl.get(bucket, key) {
            Ok(acl) => acl,
            Err(AclError::NotFound { .. }) => {
                warn!(bucket, key, "object has no ACL entry, treating it as private");
                CannedAcl::Private
            }
            Err(e) => return Err(e.into()),
        };

        debug!(bucket, key, size = meta.len(), %acl, "opened object");
        Ok(GetObjectOutput {
            body: Box::pin(file),
            size: meta.len(),
            last_modified: to_utc(meta.modified()?),
            acl,
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
        let bucket_dir = self.require_bucket(bucket).await?;

        let target = self.object_path(bucket, key);
        let parent = target
            .parent()
            .ok_or_else(|| anyhow!("object path has no parent: {}", target.display()))?;

        // Dropping `temp_path` on any early return removes the partial upload.
        let (file, temp_path) = create_upload_file(bucket, &bucket_dir, parent)
            .await?
            .into_parts();
        let mut file = fs::File::from_std(file);
        let size = tokio::io::copy(&mut body, &mut file).await?;
        file.sync_all().await?;
        drop(file);

        temp_path
            .persist(&target)
            .map_err(|e| StoreError::Io(e.error))?;
        sync_dir(parent).await?;

        self.acl.set(bucket, key, acl)?;

        debug!(bucket, key, size, %acl, "stored object");
        Ok(size)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        check_bucket(bucket)?;
        check_key(key)?;
        let bucket_dir = self.require_bucket(bucket).await?;
        let target = self.object_path(bucket, key);

        self.acl.remove(bucket, key)?;

        match fs::symlink_metadata(&target).await {
            Ok(meta) if !meta.is_dir() => {
                match fs::remove_file(&target).await {
                    Ok(()) => {}
                    Err(e) if is_not_found(&e) => {}
                    Err(e) => return Err(e.into()),
                }
                prune_empty_parents(&bucket_dir, &target).await;
                debug!(bucket, key, "deleted object");
            }
            Ok(_) => trace!(bucket, key, "key names a directory, nothing to delete"),
            Err(e) if is_not_found(&e) => trace!(bucket, key, "object already absent"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()> {
        if !self.stat_object(bucket, key).await?.exists() {
            return Err(no_such_key(bucket, key));
        }
        self.acl.set(bucket, key, acl)?;
        debug!(bucket, key, %acl, "updated object ACL");
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.acl.close()?;
        Ok(())
    }
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

/// A missing path, or a path running through a regular file.
fn is_not_found(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

fn entry_name(entry: &fs::DirEntry) -> Option<String> {
    match entry.file_name().into_string() {
        Ok(name) => Some(name),
        Err(raw) => {
            warn!(name = ?raw, "skipping entry with a non UTF-8 name");
            None
        }
    }
}

/// Create the directories from `bucket_dir` down to `dir`, one level at a
/// time. The bucket directory itself is never created, so a bucket deleted
/// mid-upload yields `NoSuchBucket`.
async fn create_key_dirs(bucket: &str, bucket_dir: &Path, dir: &Path) -> StoreResult<()> {
    let relative = dir
        .strip_prefix(bucket_dir)
        .map_err(|_| anyhow!("{} is outside bucket {bucket}", dir.display()))?;

    let mut current = bucket_dir.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::create_dir(&current).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(no_such_bucket(bucket)),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Create the temporary upload file in `dir` below `bucket_dir`.
async fn create_upload_file(
    bucket: &str,
    bucket_dir: &Path,
    dir: &Path,
) -> StoreResult<tempfile::NamedTempFile> {
    let create = || tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir);

    create_key_dirs(bucket, bucket_dir, dir).await?;
    let file = match create() {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // A concurrent delete pruned the directory after we created it.
            create_key_dirs(bucket, bucket_dir, dir).await?;
            create()
        }
        other => other,
    };
    file.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            no_such_bucket(bucket)
        } else {
            e.into()
        }
    })
}

/// Remove empty directories from the parent of `path` up to `bucket_dir`.
async fn prune_empty_parents(bucket_dir: &Path, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == bucket_dir || !dir.starts_with(bucket_dir) {
            break;
        }
        if fs::remove_dir(dir).await.is_err() {
            break;
        }
        trace!(dir = %dir.display(), "pruned empty directory");
        current = dir.parent();
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
#[allow(clippy::unused_async)]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
