//! Errors raised by the identity key lifecycle

use thiserror::Error;

use super::keystore::KeystoreError;

/// Fatal failures of provisioning, verification and key loading.
///
/// A signature that does not verify is not an error; see
/// [`VerificationResult`](super::VerificationResult).
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A required key field is absent from the configuration store
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Stored key material could not be decoded or parsed
    #[error("Key parse error: {0}")]
    KeyParse(String),

    /// A freshly generated key could not be encoded
    #[error("Key encoding error: {0}")]
    KeyEncoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KeystoreError> for IdentityError {
    fn from(err: KeystoreError) -> Self {
        match err {
            KeystoreError::MissingField(field) => {
                IdentityError::ConfigurationMissing(format!("{} is not set", field))
            }
            KeystoreError::InvalidField { field, reason } => {
                IdentityError::KeyParse(format!("{}: {}", field, reason))
            }
            KeystoreError::Io(e) => IdentityError::Io(e),
        }
    }
}
