//! Error types for the Objets core.

use std::path::PathBuf;

/// Core error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ObjetsError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    ReadConfig {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::ObjetsConfig`].
    #[error("failed to parse config file {}: {source}", path.display())]
    ParseConfig {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A configuration value is semantically invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for core operations.
pub type ObjetsResult<T> = Result<T, ObjetsError>;
