//! Key verification
//!
//! Loads the stored record, signs a well-known message with the private key
//! and checks the signature with the public key. A failed check is reported
//! through [`VerificationResult`]; only unreadable or malformed configuration
//! is an error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, info, warn};

use super::error::IdentityError;
use super::key_id::KeyId;
use super::keystore::Keystore;

/// Message signed by the verifier unless another is supplied
pub const TEST_MESSAGE: &str =
    "Hello, MediChain! This is a test message for SSI key verification.";

/// Outcome of a verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub ok: bool,
    pub key_id: KeyId,
    /// Base64 of the signature produced during the check
    pub signature_base64: String,
    pub detail: String,
}

pub struct Verifier<'a> {
    keystore: &'a dyn Keystore,
    message: Vec<u8>,
}

impl<'a> Verifier<'a> {
    pub fn new(keystore: &'a dyn Keystore) -> Self {
        Self {
            keystore,
            message: TEST_MESSAGE.as_bytes().to_vec(),
        }
    }

    /// Sign `message` instead of [`TEST_MESSAGE`]
    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.message = message.into();
        self
    }

    pub fn verify(&self) -> Result<VerificationResult, IdentityError> {
        let record = self.keystore.load_record()?;
        debug!(key_id = %record.key_id(), "Loaded SSI key record");

        let keypair = record.decode_keypair()?;
        let public_key = record.decode_public_key()?;

        let fingerprint = public_key.key_id()?;
        if &fingerprint != record.key_id() {
            return Err(IdentityError::KeyParse(format!(
                "stored public key does not match key id {} (fingerprint is {})",
                record.key_id(),
                fingerprint
            )));
        }

        let signature = keypair.sign(&self.message);
        let ok = public_key.verify(&self.message, &signature);

        let detail = if ok {
            info!(key_id = %fingerprint, "SSI key verification succeeded");
            "signature verification successful; the SSI keys are working".to_string()
        } else {
            warn!(key_id = %fingerprint, "SSI key verification failed");
            "signature verification failed; the private key does not match the public key"
                .to_string()
        };

        Ok(VerificationResult {
            ok,
            key_id: fingerprint,
            signature_base64: BASE64.encode(signature.to_bytes()),
            detail,
        })
    }
}
