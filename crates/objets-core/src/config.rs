//! Process configuration.
//!
//! Provides [`ObjetsConfig`], loaded once at startup from a YAML document and
//! then adjusted by environment variables. The configuration is immutable for
//! the lifetime of the process.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::{ObjetsError, ObjetsResult};

/// Data directory used when the configuration does not name one.
pub const DEFAULT_DATA_DIR: &str = "./objets_data";

/// Listen address used without automatic TLS.
const DEFAULT_LISTEN: &str = ":8060";

/// Listen address used when automatic TLS is requested.
const DEFAULT_TLS_LISTEN: &str = ":443";

/// Name of the bucket root directory inside the data directory.
const BUCKETS_DIR: &str = "buckets";

/// File name of the ACL database inside the data directory.
const ACL_DB_FILE: &str = "acl.db";

/// Objets process configuration.
///
/// Every field has a default, so an empty YAML document is a valid
/// configuration.
///
/// # Examples
///
/// ```
/// use objets_core::ObjetsConfig;
///
/// let yaml = "data_dir: /srv/objets\ntls_auto: true\ntls_domains: [s3.example.com]\n";
/// let config = ObjetsConfig::from_yaml_str(yaml).unwrap();
/// assert_eq!(config.listen(), ":443");
/// assert!(config.acl_db_path().ends_with("acl.db"));
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct ObjetsConfig {
    /// Where bucket directories and the ACL database live.
    #[builder(default = String::from(DEFAULT_DATA_DIR))]
    pub data_dir: String,

    /// Explicit listen address for the protocol front end.
    #[builder(default, setter(strip_option))]
    pub listen: Option<String>,

    /// Whether the front end provisions TLS certificates automatically.
    #[builder(default = false)]
    pub tls_auto: bool,

    /// Domains to provision certificates for when `tls_auto` is set.
    #[builder(default)]
    pub tls_domains: Vec<String>,

    /// Access key ID of the single static credential pair.
    #[builder(default)]
    pub access_key_id: String,

    /// Secret access key of the single static credential pair.
    #[builder(default)]
    pub secret_access_key: String,

    /// Log level filter string (e.g. `"info"`, `"objets_store=debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ObjetsConfig {
    fn default() -> Self {
        Self {
            data_dir: String::from(DEFAULT_DATA_DIR),
            listen: None,
            tls_auto: false,
            tls_domains: Vec::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            log_level: String::from("info"),
        }
    }
}

impl fmt::Debug for ObjetsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjetsConfig")
            .field("data_dir", &self.data_dir)
            .field("listen", &self.listen)
            .field("tls_auto", &self.tls_auto)
            .field("tls_domains", &self.tls_domains)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ObjetsConfig {
    /// Parse a configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ObjetsError::ParseConfig`] for malformed YAML and
    /// [`ObjetsError::Config`] when [`validate`](Self::validate) rejects it.
    pub fn from_yaml_str(yaml: &str) -> ObjetsResult<Self> {
        Self::parse(yaml, Path::new("<inline>"))
    }

    /// Read and parse a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ObjetsError::ReadConfig`] if the file cannot be read, and the
    /// same errors as [`from_yaml_str`](Self::from_yaml_str) otherwise.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ObjetsResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ObjetsError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::parse(&yaml, path)
    }

    fn parse(yaml: &str, path: &Path) -> ObjetsResult<Self> {
        // An empty document deserializes to unit, not to a map.
        let config = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| ObjetsError::ParseConfig {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `OBJETS_DATA_DIR` | `data_dir` |
    /// | `OBJETS_LISTEN` | `listen` |
    /// | `OBJETS_TLS_AUTO` | `tls_auto` |
    /// | `OBJETS_ACCESS_KEY_ID` | `access_key_id` |
    /// | `OBJETS_SECRET_ACCESS_KEY` | `secret_access_key` |
    /// | `LOG_LEVEL` | `log_level` |
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("OBJETS_DATA_DIR") {
            self.data_dir = v;
        }
        if let Some(v) = lookup("OBJETS_LISTEN") {
            self.listen = Some(v);
        }
        if let Some(v) = lookup("OBJETS_TLS_AUTO") {
            self.tls_auto = parse_bool(&v);
        }
        if let Some(v) = lookup("OBJETS_ACCESS_KEY_ID") {
            self.access_key_id = v;
        }
        if let Some(v) = lookup("OBJETS_SECRET_ACCESS_KEY") {
            self.secret_access_key = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v;
        }
        self
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ObjetsError::Config`] if the data directory is empty, if
    /// automatic TLS is requested without domains, or if only one half of the
    /// credential pair is set.
    pub fn validate(&self) -> ObjetsResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(ObjetsError::Config("data_dir must not be empty".to_owned()));
        }
        if self.tls_auto && self.tls_domains.is_empty() {
            return Err(ObjetsError::Config(
                "tls_auto requires at least one entry in tls_domains".to_owned(),
            ));
        }
        if self.access_key_id.is_empty() != self.secret_access_key.is_empty() {
            return Err(ObjetsError::Config(
                "access_key_id and secret_access_key must be set together".to_owned(),
            ));
        }
        Ok(())
    }

    /// Effective listen address.
    #[must_use]
    pub fn listen(&self) -> &str {
        match &self.listen {
            Some(listen) => listen,
            None if self.tls_auto => DEFAULT_TLS_LISTEN,
            None => DEFAULT_LISTEN,
        }
    }

    /// Root directory holding one directory per bucket.
    #[must_use]
    pub fn buckets_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join(BUCKETS_DIR)
    }

    /// Path of the ACL database file.
    #[must_use]
    pub fn acl_db_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(ACL_DB_FILE)
    }

    /// Whether a static credential pair is configured.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty()
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
