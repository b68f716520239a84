//! Core configuration and error types for Objets.
//!
//! This crate holds the pieces shared by the storage layer and the server
//! binary: the process-wide [`ObjetsConfig`] loaded once at startup and the
//! [`ObjetsError`] type reported when that loading fails.

mod config;
mod error;

pub use config::{DEFAULT_DATA_DIR, ObjetsConfig};
pub use error::{ObjetsError, ObjetsResult};
