//! Durable `(bucket, key) -> CannedAcl` store backed by redb.
//!
//! Entries live in a single table keyed by the `(bucket, key)` tuple, so the
//! entries of one bucket are contiguous and can be removed in one
//! transaction. Every mutation is its own durable write transaction.
//!
//! # Locking
//!
//! The database handle sits behind one [`parking_lot::Mutex`] owned by the
//! store. Reads and writes both take it, and it is held for exactly one
//! get/set/remove call. It never spans the filesystem work of the object
//! backend.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info, trace};

use crate::error::AclError;
use crate::types::CannedAcl;

/// Key: `(bucket, key)`, value: canned ACL wire string.
const ACL_TABLE: TableDefinition<(&str, &str), &str> = TableDefinition::new("object_acl");

/// Persistent ACL store.
///
/// # Examples
///
/// ```
/// use objets_store::acl::AclStore;
/// use objets_store::types::CannedAcl;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = AclStore::open(dir.path().join("acl.db")).unwrap();
/// store.set("imgs", "a/b.png", CannedAcl::PublicRead).unwrap();
/// assert_eq!(store.get("imgs", "a/b.png").unwrap(), CannedAcl::PublicRead);
/// store.close().unwrap();
/// ```
pub struct AclStore {
    db: Mutex<Option<Database>>,
    path: PathBuf,
}

impl fmt::Debug for AclStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AclStore")
            .field("path", &self.path)
            .field("open", &self.db.lock().is_some())
            .finish()
    }
}

impl AclStore {
    /// Create or open the ACL database at `path`.
    ///
    /// Creates the parent directory and the table if they do not exist.
    /// redb holds a file lock, so a second open of the same path fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AclError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AclError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let db = Database::create(&path)?;

        let txn = db.begin_write()?;
        {
            txn.open_table(ACL_TABLE)?;
        }
        txn.commit()?;

        info!(path = %path.display(), "opened ACL store");

        Ok(Self {
            db: Mutex::new(Some(db)),
            path,
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the open database while holding the store lock.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T, AclError>) -> Result<T, AclError> {
        let guard = self.db.lock();
        let db = guard.as_ref().ok_or(AclError::Closed)?;
        f(db)
    }

    /// Record `acl` for the object, replacing any previous value.
    pub fn set(&self, bucket: &str, key: &str, acl: CannedAcl) -> Result<(), AclError> {
        self.with_db(|db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(ACL_TABLE)?;
                table.insert((bucket, key), acl.as_str())?;
            }
            txn.commit()?;
            Ok(())
        })?;
        trace!(bucket, key, %acl, "stored ACL");
        Ok(())
    }

    /// Look up the ACL of an object.
    ///
    /// # Errors
    ///
    /// - [`AclError::NotFound`] when no entry exists.
    /// - [`AclError::Corrupt`] when the stored value is not a canned ACL.
    /// - [`AclError::Closed`] / [`AclError::Storage`] on store failures.
    pub fn get(&self, bucket: &str, key: &str) -> Result<CannedAcl, AclError> {
        self.with_db(|db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(ACL_TABLE)?;
            let Some(value) = table.get((bucket, key))? else {
                return Err(AclError::NotFound {
                    bucket: bucket.to_owned(),
                    key: key.to_owned(),
                });
            };
            let raw = value.value();
            raw.parse::<CannedAcl>().map_err(|_| AclError::Corrupt {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                value: raw.to_owned(),
            })
        })
    }

    /// Remove the ACL of an object. Removing a missing entry is not an error.
    pub fn remove(&self, bucket: &str, key: &str) -> Result<(), AclError> {
        let removed = self.with_db(|db| {
            let txn = db.begin_write()?;
            let removed = {
                let mut table = txn.open_table(ACL_TABLE)?;
                table.remove((bucket, key))?.is_some()
            };
            txn.commit()?;
            Ok(removed)
        })?;
        trace!(bucket, key, removed, "removed ACL");
        Ok(())
    }

    /// Remove every entry of `bucket` in one transaction.
    ///
    /// `keys` are the objects found on disk; entries recorded under the
    /// bucket but not listed (orphans) are removed too. Either all entries
    /// go or none do. Returns the number of entries removed.
    pub fn remove_bucket(&self, bucket: &str, keys: &[String]) -> Result<usize, AclError> {
        let removed = self.with_db(|db| {
            let txn = db.begin_write()?;
            let removed = {
                let mut table = txn.open_table(ACL_TABLE)?;
                let mut targets: BTreeSet<String> = keys.iter().cloned().collect();
                targets.extend(bucket_keys(&table, bucket)?);

                let mut removed = 0;
                for key in &targets {
                    if table.remove((bucket, key.as_str()))?.is_some() {
                        removed += 1;
                    }
                }
                removed
            };
            txn.commit()?;
            Ok(removed)
        })?;
        debug!(bucket, listed = keys.len(), removed, "removed bucket ACLs");
        Ok(removed)
    }

    /// Keys with an entry under `bucket`, in key order.
    pub fn keys(&self, bucket: &str) -> Result<Vec<String>, AclError> {
        self.with_db(|db| {
            let txn = db.begin_read()?;
            let table = txn.open_table(ACL_TABLE)?;
            bucket_keys(&table, bucket)
        })
    }

    /// Release the database handle.
    ///
    /// Every later operation fails with [`AclError::Closed`]; closing again
    /// is a no-op.
    pub fn close(&self) -> Result<(), AclError> {
        let db = self.db.lock().take();
        match db {
            Some(db) => {
                drop(db);
                info!(path = %self.path.display(), "closed ACL store");
            }
            None => debug!(path = %self.path.display(), "ACL store already closed"),
        }
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.db.lock().is_none()
    }
}

/// Collect the keys recorded under `bucket` from any readable table.
fn bucket_keys(
    table: &impl ReadableTable<(&'static str, &'static str), &'static str>,
    bucket: &str,
) -> Result<Vec<String>, AclError> {
    let mut keys = Vec::new();
    for entry in table.range((bucket, "")..)? {
        let (k, _) = entry?;
        let (entry_bucket, key) = k.value();
        if entry_bucket != bucket {
            break;
        }
        keys.push(key.to_owned());
    }
    Ok(keys)
}
