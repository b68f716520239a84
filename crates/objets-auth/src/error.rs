//! Error types for credential lookup.

/// Errors returned by a [`crate::CredentialProvider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The access key ID is not known to the credential store.
    #[error("unknown access key ID: {0}")]
    UnknownAccessKeyId(String),
}
