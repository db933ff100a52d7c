//! Signatures module
//!
//! Detached signature envelope attached to credentials issued by the portal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key_id::KeyId;
use super::keypair::KeyAlgorithm;

/// Signature over some credential payload plus what a verifier needs to
/// check it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalSignature {
    /// Base64 of the 64-byte Ed25519 signature
    pub signature: String,
    /// Human-facing algorithm name, `Ed25519`
    pub algorithm: String,
    /// SPKI PEM of the signing key
    pub public_key: String,
    pub timestamp: DateTime<Utc>,
    pub key_id: KeyId,
    pub key_type: KeyAlgorithm,
}
