//! Credential lookup for the Objets protocol front end.
//!
//! The front end verifies request signatures itself; it only asks this crate
//! for the secret key that belongs to an access key ID. Objets is configured
//! with a single static credential pair, exposed through
//! [`StaticCredentialProvider`].
//!
//! ```rust
//! use objets_auth::{CredentialProvider, StaticCredentialProvider};
//!
//! let provider = StaticCredentialProvider::new(vec![("AKID".to_owned(), "secret".to_owned())]);
//! assert_eq!(provider.get_secret_key("AKID").unwrap(), "secret");
//! ```

pub mod credentials;
pub mod error;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::AuthError;
