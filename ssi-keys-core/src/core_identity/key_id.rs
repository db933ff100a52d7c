//! Key fingerprints
//!
//! A key id is the first 16 hex characters (64 bits) of the SHA-256 digest of
//! the public key's SPKI DER encoding. It is meant to be scanned by humans
//! inside one deployment and is not collision resistant across deployments.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters kept from the digest
pub const KEY_ID_HEX_LEN: usize = 16;

/// Short fingerprint of an SSI public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

impl KeyId {
    /// Fingerprint of an SPKI DER encoded public key
    pub fn from_public_key_der(spki_der: &[u8]) -> Self {
        let mut digest = hex::encode(Sha256::digest(spki_der));
        digest.truncate(KEY_ID_HEX_LEN);
        KeyId(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for KeyId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != KEY_ID_HEX_LEN {
            return Err(format!(
                "key id must be {} hex characters, got {}",
                KEY_ID_HEX_LEN,
                s.len()
            ));
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(format!("key id {:?} is not lowercase hex", s));
        }
        Ok(KeyId(s.to_string()))
    }
}

impl TryFrom<String> for KeyId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> Self {
        id.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
