//! Path guard for bucket names, object keys, and listing prefixes.
//!
//! Every backend operation runs these checks before it touches the
//! filesystem or the ACL store. A component is unsafe when any segment,
//! split on `/` or `\`, is exactly `..`.
//!
//! Keys are additionally required to be canonical (no empty or `.`
//! segments) so that each key maps to exactly one file and one ACL entry.

use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// File name prefix of in-flight uploads inside bucket directories.
///
/// Keys may not use it, so listings can skip those files unambiguously.
pub const TEMP_PREFIX: &str = ".objets-upload-";

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Whether `component` is free of `..` traversal segments.
///
/// # Examples
///
/// ```
/// use objets_store::path::is_safe;
///
/// assert!(is_safe("photos/2024/a..b.png"));
/// assert!(!is_safe("photos/../../etc/passwd"));
/// assert!(!is_safe("..\\windows"));
/// ```
#[must_use]
pub fn is_safe(component: &str) -> bool {
    if !component.contains("..") {
        return true;
    }
    !component.split(is_separator).any(|segment| segment == "..")
}

/// Validate a bucket name.
///
/// The name must be safe, non-empty, free of separators, and not `.`.
pub fn check_bucket(bucket: &str) -> StoreResult<()> {
    if !is_safe(bucket) || bucket.is_empty() || bucket == "." || bucket.contains(is_separator) {
        return Err(StoreError::invalid_path(bucket));
    }
    Ok(())
}

/// Validate an object key.
///
/// The key must be safe and made of non-empty segments other than `.`; it
/// therefore can neither be empty nor start or end with `/`.
pub fn check_key(key: &str) -> StoreResult<()> {
    if !is_safe(key) || !key.split('/').all(is_valid_segment) {
        return Err(StoreError::invalid_path(key));
    }
    Ok(())
}

/// Validate a listing prefix.
///
/// An empty prefix lists the bucket root; a single trailing `/` is allowed.
pub fn check_prefix(prefix: &str) -> StoreResult<()> {
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    if !is_safe(prefix)
        || prefix.starts_with('/')
        || (!trimmed.is_empty() && !trimmed.split('/').all(is_valid_segment))
    {
        return Err(StoreError::invalid_path(prefix));
    }
    Ok(())
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.starts_with(TEMP_PREFIX)
}

/// Resolve a checked key or prefix below `base`, one segment at a time.
///
/// Pushing segments individually keeps a leading `/` from replacing `base`.
pub(crate) fn resolve(base: &Path, relative: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

/// Join a listing prefix and a child name into a key.
///
/// # Examples
///
/// ```
/// use objets_store::path::join_key;
///
/// assert_eq!(join_key("", "a"), "a");
/// assert_eq!(join_key("a/", "b.png"), "a/b.png");
/// assert_eq!(join_key("a", "b.png"), "a/b.png");
/// ```
#[must_use]
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}
