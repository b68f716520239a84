//! Value types exchanged between object backends and the protocol front end.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::AclError;

/// Object body stream, used for both uploads and downloads.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Format used for `LastModified` values in listings, e.g.
/// `2006-02-03T16:45:09.000Z`.
const S3_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp the way S3 listings do.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use objets_store::types::format_s3_date;
///
/// let t = Utc.with_ymd_and_hms(2006, 2, 3, 16, 45, 9).unwrap();
/// assert_eq!(format_s3_date(&t), "2006-02-03T16:45:09.000Z");
/// ```
#[must_use]
pub fn format_s3_date(time: &DateTime<Utc>) -> String {
    time.format(S3_DATE_FORMAT).to_string()
}

pub(crate) fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

// ---------------------------------------------------------------------------
// CannedAcl
// ---------------------------------------------------------------------------

/// Predefined (canned) ACL attached to an object.
///
/// The storage layer persists the value and hands it back; interpreting it
/// is up to the protocol front end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    /// Owner gets `FULL_CONTROL`. No one else has access rights (default).
    #[default]
    Private,
    /// Owner gets `FULL_CONTROL`. The `AllUsers` group gets `READ` access.
    PublicRead,
    /// Owner gets `FULL_CONTROL`. The `AllUsers` group gets `READ` and `WRITE` access.
    PublicReadWrite,
    /// Owner gets `FULL_CONTROL`. The `AuthenticatedUsers` group gets `READ` access.
    AuthenticatedRead,
    /// Owner gets `FULL_CONTROL`. Amazon EC2 gets `READ` access to the object.
    AwsExecRead,
    /// Object owner gets `FULL_CONTROL`. Bucket owner gets `READ` access.
    BucketOwnerRead,
    /// Both the object owner and the bucket owner get `FULL_CONTROL`.
    BucketOwnerFullControl,
    /// The `LogDelivery` group gets `WRITE` and `READ_ACP` permissions.
    LogDeliveryWrite,
}

impl CannedAcl {
    /// Return the wire representation of the canned ACL.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::AwsExecRead => "aws-exec-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
            Self::LogDeliveryWrite => "log-delivery-write",
        }
    }

    /// Whether anonymous clients may read the object.
    #[must_use]
    pub fn allows_anonymous_read(&self) -> bool {
        matches!(self, Self::PublicRead | Self::PublicReadWrite)
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`CannedAcl`] from a string fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown canned ACL: {0}")]
pub struct ParseCannedAclError(String);

impl FromStr for CannedAcl {
    type Err = ParseCannedAclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            "aws-exec-read" => Ok(Self::AwsExecRead),
            "bucket-owner-read" => Ok(Self::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(Self::BucketOwnerFullControl),
            "log-delivery-write" => Ok(Self::LogDeliveryWrite),
            _ => Err(ParseCannedAclError(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing types
// ---------------------------------------------------------------------------

/// A bucket as reported by [`crate::ObjectBackend::buckets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation time, approximated by the directory modification time.
    pub creation_date: DateTime<Utc>,
}

/// A file entry of a single-level listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key (prefix included).
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

impl ObjectSummary {
    /// `last_modified` in listing format.
    #[must_use]
    pub fn last_modified_string(&self) -> String {
        format_s3_date(&self.last_modified)
    }
}

/// A directory entry of a single-level listing, always ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommonPrefix {
    /// The prefix, e.g. `a/`.
    pub prefix: String,
}

/// Result of [`crate::ObjectBackend::list_bucket`], both parts sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketResult {
    /// Files directly under the prefix.
    pub contents: Vec<ObjectSummary>,
    /// Directories directly under the prefix.
    pub common_prefixes: Vec<CommonPrefix>,
}

// ---------------------------------------------------------------------------
// Object access
// ---------------------------------------------------------------------------

/// Result of [`crate::ObjectBackend::stat_object`].
///
/// Existence comes from the object bytes alone. When the object exists the
/// ACL lookup outcome is carried along, so an ACL failure never hides the
/// object.
#[derive(Debug)]
pub enum ObjectStat {
    /// No object bytes exist for the key.
    Missing,
    /// The object exists.
    Present {
        /// Outcome of the ACL lookup.
        acl: Result<CannedAcl, AclError>,
    },
}

impl ObjectStat {
    /// Whether the object exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// The ACL to enforce: the recorded one, or [`CannedAcl::Private`] when
    /// the lookup failed. `None` when the object does not exist.
    #[must_use]
    pub fn effective_acl(&self) -> Option<CannedAcl> {
        match self {
            Self::Missing => None,
            Self::Present { acl } => Some(acl.as_ref().copied().unwrap_or_default()),
        }
    }
}

/// An opened object.
pub struct GetObjectOutput {
    /// Object content.
    pub body: ByteStream,
    /// Size in bytes at open time.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// ACL to enforce for this object.
    pub acl: CannedAcl,
}

impl fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("size", &self.size)
            .field("last_modified", &self.last_modified)
            .field("acl", &self.acl)
            .finish_non_exhaustive()
    }
}

impl GetObjectOutput {
    /// Read the whole body into memory.
    pub async fn collect(mut self) -> std::io::Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buf = Vec::with_capacity(usize::try_from(self.size).unwrap_or(0));
        self.body.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}
