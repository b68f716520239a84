//! Storage-layer error types.
//!
//! [`StoreError`] is what every [`crate::ObjectBackend`] operation returns.
//! [`AclError`] is the narrower error of the [`crate::acl::AclStore`]; it keeps
//! "no entry" ([`AclError::NotFound`]) apart from engine failures so callers
//! can tell "object has no ACL" from "ACL store is broken".
//!
//! # Usage
//!
//! ```
//! use objets_store::error::StoreError;
//!
//! let err = StoreError::NoSuchBucket {
//!     bucket: "imgs".to_owned(),
//! };
//! assert_eq!(err.code(), "NoSuchBucket");
//! assert_eq!(err.status_code(), 404);
//! ```

use std::path::PathBuf;

/// Errors raised by the ACL store.
#[derive(Debug, thiserror::Error)]
pub enum AclError {
    /// No ACL entry is recorded for the object.
    #[error("no ACL entry for {bucket}/{key}")]
    NotFound {
        /// Bucket of the missing entry.
        bucket: String,
        /// Key of the missing entry.
        key: String,
    },

    /// The stored value is not a known canned ACL.
    #[error("corrupt ACL entry for {bucket}/{key}: {value:?}")]
    Corrupt {
        /// Bucket of the entry.
        bucket: String,
        /// Key of the entry.
        key: String,
        /// The raw stored value.
        value: String,
    },

    /// The store has been closed.
    #[error("ACL store is closed")]
    Closed,

    /// The directory holding the database could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The embedded database engine failed.
    #[error("ACL database error: {0}")]
    Storage(#[source] Box<redb::Error>),
}

impl AclError {
    /// Whether this error only means the entry does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

macro_rules! impl_from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AclError {
                fn from(err: $ty) -> Self {
                    Self::Storage(Box::new(redb::Error::from(err)))
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Errors surfaced by object backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A bucket, key, or prefix failed the path guard.
    #[error("invalid path: {path:?}")]
    InvalidPath {
        /// The rejected input.
        path: String,
    },

    /// The bucket (or the listed prefix directory) does not exist.
    #[error("the specified bucket does not exist: {bucket}")]
    NoSuchBucket {
        /// Bucket name.
        bucket: String,
    },

    /// The object does not exist.
    #[error("the specified key does not exist: {bucket}/{key}")]
    NoSuchKey {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },

    /// The storage root directory is missing, which is a configuration error.
    #[error("storage root does not exist: {}", path.display())]
    StorageRootNotFound {
        /// Expected root directory.
        path: PathBuf,
    },

    /// The ACL store failed.
    #[error(transparent)]
    Acl(#[from] AclError),

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Build an [`StoreError::InvalidPath`] for `path`.
    pub(crate) fn invalid_path(path: &str) -> Self {
        Self::InvalidPath {
            path: path.to_owned(),
        }
    }

    /// S3 error code a protocol front end should report.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "InvalidArgument",
            Self::NoSuchBucket { .. } => "NoSuchBucket",
            Self::NoSuchKey { .. } => "NoSuchKey",
            Self::StorageRootNotFound { .. }
            | Self::Acl(_)
            | Self::Io(_)
            | Self::Internal(_) => "InternalError",
        }
    }

    /// HTTP status code matching [`code`](Self::code).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPath { .. } => 400,
            Self::NoSuchBucket { .. } | Self::NoSuchKey { .. } => 404,
            _ => 500,
        }
    }

    /// Whether retrying the same request can never succeed.
    ///
    /// Rejections are deterministic and have no side effects; the caller has
    /// to change its input.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath { .. } | Self::NoSuchBucket { .. } | Self::NoSuchKey { .. }
        )
    }
}

/// Convenience result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
