//! Keypair module
//!
//! Ed25519 key material for the SSI identity and its interoperable encodings:
//! PKCS#8 PEM for the private key and SPKI PEM for the public key (RFC 8410),
//! so any other implementation can parse what we persist.
//!
//! Security: the signing key zeroizes itself on drop (ed25519-dalek), PEM
//! renderings of it are handed out as `Zeroizing<String>`, and `Debug` never
//! prints secret bytes.

use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SIGNATURE_LENGTH};
use pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

use super::error::IdentityError;
use super::key_id::KeyId;

/// Signature algorithms an SSI record may declare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Ed25519,
}

impl KeyAlgorithm {
    /// Tag stored in `SSI_KEY_TYPE`
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
        }
    }

    /// Name used in signature envelopes
    pub fn display_name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "Ed25519",
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ed25519") {
            Ok(KeyAlgorithm::Ed25519)
        } else {
            Err(format!("unsupported key algorithm {:?}", s))
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ed25519 signing keypair.
///
/// Not `Clone`: the secret half exists once per load and is zeroized on drop.
///
/// ```compile_fail
/// fn copy<T: Clone>(_: &T) {}
/// copy(&ssi_keys_core::core_identity::SsiKeypair::generate());
/// ```
pub struct SsiKeypair {
    signing_key: SigningKey,
}

impl SsiKeypair {
    /// Generate a fresh keypair from the operating system CSPRNG
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    /// Parse a PKCS#8 PEM private key
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, IdentityError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| IdentityError::KeyParse(format!("invalid PKCS#8 private key: {}", e)))?;
        Ok(Self { signing_key })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ed25519
    }

    /// PKCS#8 PEM encoding of the private key
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, IdentityError> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| IdentityError::KeyEncoding(format!("PKCS#8 encoding failed: {}", e)))
    }

    pub fn public_key(&self) -> SsiPublicKey {
        SsiPublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign a raw message; Ed25519 hashes internally, no pre-hash is applied
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl fmt::Debug for SsiKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsiKeypair")
            .field("public", &hex::encode(self.signing_key.verifying_key().as_bytes()))
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Ed25519 public key of an SSI identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsiPublicKey {
    verifying_key: VerifyingKey,
}

impl SsiPublicKey {
    /// Parse an SPKI PEM public key
    pub fn from_spki_pem(pem: &str) -> Result<Self, IdentityError> {
        let verifying_key = VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| IdentityError::KeyParse(format!("invalid SPKI public key: {}", e)))?;
        Ok(Self { verifying_key })
    }

    /// SPKI DER encoding, the input of the key id
    pub fn to_spki_der(&self) -> Result<Vec<u8>, IdentityError> {
        let doc = self
            .verifying_key
            .to_public_key_der()
            .map_err(|e| IdentityError::KeyEncoding(format!("SPKI encoding failed: {}", e)))?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn to_spki_pem(&self) -> Result<String, IdentityError> {
        self.verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| IdentityError::KeyEncoding(format!("SPKI encoding failed: {}", e)))
    }

    pub fn key_id(&self) -> Result<KeyId, IdentityError> {
        Ok(KeyId::from_public_key_der(&self.to_spki_der()?))
    }

    /// Raw 32-byte compressed point
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.verifying_key.verify(message, signature).is_ok()
    }

    /// Verify a signature given as bytes; wrong lengths simply fail
    pub fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool {
        if signature.len() != SIGNATURE_LENGTH {
            return false;
        }
        match Signature::from_slice(signature) {
            Ok(sig) => self.verify(message, &sig),
            Err(_) => false,
        }
    }
}
