//! Storage layer for Objets, a small S3-compatible object server.
//!
//! Object bytes live on the local filesystem, one directory per bucket, and
//! each object's canned ACL lives in an embedded [`redb`] database. The
//! protocol front end talks to storage only through the [`ObjectBackend`]
//! trait.
//!
//! # Architecture
//!
//! ```text
//!   protocol front end (S3 routing, XML, auth)
//!          |
//!          v
//!   ObjectBackend (trait)
//!      |                  \
//!      v                   v
//!   FsObjectStore       MemoryObjectStore (tests)
//!      |        \
//!      v         v
//!   <root>/    AclStore (redb: (bucket, key) -> canned ACL)
//! ```
//!
//! Every bucket name, key, and prefix goes through [`path`] before storage
//! is touched.

pub mod acl;
pub mod backend;
pub mod error;
pub mod fs;
pub mod memory;
pub mod path;
pub mod types;

pub use acl::AclStore;
pub use backend::ObjectBackend;
pub use error::{AclError, StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;
pub use types::{
    Bucket, ByteStream, CannedAcl, CommonPrefix, GetObjectOutput, ListBucketResult, ObjectStat,
    ObjectSummary,
};
