//! Persisted key record
//!
//! What the provisioner writes to the configuration store: both keys as
//! base64 of their PEM text, the key id, the algorithm tag and the generation
//! time (RFC 3339, UTC, millisecond precision).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use zeroize::Zeroizing;

use super::error::IdentityError;
use super::key_id::KeyId;
use super::keypair::{KeyAlgorithm, SsiKeypair, SsiPublicKey};
use super::keystore::{
    is_set, KeystoreError, FIELD_GENERATED_AT, FIELD_KEY_ID, FIELD_KEY_TYPE, FIELD_PRIVATE_KEY,
    FIELD_PUBLIC_KEY,
};

/// SSI key record as held by a keystore
pub struct KeyRecord {
    key_id: KeyId,
    private_key_base64: SecretString,
    public_key_base64: String,
    algorithm: KeyAlgorithm,
    generated_at: Option<DateTime<Utc>>,
}

impl KeyRecord {
    /// Record for a freshly generated keypair
    pub fn from_keypair(
        keypair: &SsiKeypair,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, IdentityError> {
        let public_key = keypair.public_key();
        let private_pem = keypair.private_key_pem()?;
        let public_pem = public_key.to_spki_pem()?;

        Ok(Self {
            key_id: public_key.key_id()?,
            private_key_base64: SecretString::new(BASE64.encode(private_pem.as_bytes())),
            public_key_base64: BASE64.encode(public_pem.as_bytes()),
            algorithm: keypair.algorithm(),
            generated_at: Some(generated_at),
        })
    }

    /// Assemble a record from stored fields.
    ///
    /// The private and public key are required; an empty value counts as
    /// absent. A missing key id is derived from the public key, a missing
    /// algorithm defaults to Ed25519. Key material is not parsed here beyond
    /// what deriving the key id needs.
    pub fn from_fields<F>(get: F) -> Result<Self, KeystoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| get(name).filter(|v| is_set(Some(v)));

        let private_key_base64 = present(FIELD_PRIVATE_KEY)
            .map(SecretString::new)
            .ok_or(KeystoreError::MissingField(FIELD_PRIVATE_KEY))?;
        let public_key_base64 = present(FIELD_PUBLIC_KEY)
            .map(|v| v.trim().to_string())
            .ok_or(KeystoreError::MissingField(FIELD_PUBLIC_KEY))?;

        let algorithm = match present(FIELD_KEY_TYPE) {
            Some(tag) => tag.parse::<KeyAlgorithm>().map_err(|reason| KeystoreError::InvalidField {
                field: FIELD_KEY_TYPE,
                reason,
            })?,
            None => KeyAlgorithm::default(),
        };

        let generated_at = match present(FIELD_GENERATED_AT) {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(ts.trim())
                    .map_err(|e| KeystoreError::InvalidField {
                        field: FIELD_GENERATED_AT,
                        reason: e.to_string(),
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let key_id = match present(FIELD_KEY_ID) {
            Some(id) => id.parse::<KeyId>().map_err(|reason| KeystoreError::InvalidField {
                field: FIELD_KEY_ID,
                reason,
            })?,
            None => decode_public_key(&public_key_base64)
                .and_then(|key| key.key_id())
                .map_err(|e| KeystoreError::InvalidField {
                    field: FIELD_PUBLIC_KEY,
                    reason: e.to_string(),
                })?,
        };

        Ok(Self {
            key_id,
            private_key_base64,
            public_key_base64,
            algorithm,
            generated_at,
        })
    }

    /// Hand each `(field, value)` pair to `put`, in store order
    pub fn write_fields<F>(&self, mut put: F)
    where
        F: FnMut(&'static str, &str),
    {
        put(FIELD_PRIVATE_KEY, self.private_key_base64.expose_secret());
        put(FIELD_PUBLIC_KEY, &self.public_key_base64);
        put(FIELD_KEY_ID, self.key_id.as_str());
        put(FIELD_KEY_TYPE, self.algorithm.as_str());
        if let Some(ts) = self.generated_at {
            put(FIELD_GENERATED_AT, &format_timestamp(ts));
        }
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    pub fn public_key_base64(&self) -> &str {
        &self.public_key_base64
    }

    pub fn private_key_base64(&self) -> &SecretString {
        &self.private_key_base64
    }

    /// PKCS#8 PEM text of the private key
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>, IdentityError> {
        let bytes = Zeroizing::new(
            BASE64
                .decode(self.private_key_base64.expose_secret().trim())
                .map_err(|e| IdentityError::KeyParse(format!("{}: invalid base64: {}", FIELD_PRIVATE_KEY, e)))?,
        );
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| IdentityError::KeyParse(format!("{}: not UTF-8 PEM text", FIELD_PRIVATE_KEY)))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    /// SPKI PEM text of the public key
    pub fn public_key_pem(&self) -> Result<String, IdentityError> {
        decode_pem_text(FIELD_PUBLIC_KEY, &self.public_key_base64)
    }

    pub fn decode_keypair(&self) -> Result<SsiKeypair, IdentityError> {
        SsiKeypair::from_pkcs8_pem(&self.private_key_pem()?)
    }

    pub fn decode_public_key(&self) -> Result<SsiPublicKey, IdentityError> {
        decode_public_key(&self.public_key_base64)
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("generated_at", &self.generated_at)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Timestamp layout written to `SSI_KEY_GENERATED_AT`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_pem_text(field: &str, encoded: &str) -> Result<String, IdentityError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| IdentityError::KeyParse(format!("{}: invalid base64: {}", field, e)))?;
    String::from_utf8(bytes)
        .map_err(|_| IdentityError::KeyParse(format!("{}: not UTF-8 PEM text", field)))
}

fn decode_public_key(encoded: &str) -> Result<SsiPublicKey, IdentityError> {
    SsiPublicKey::from_spki_pem(&decode_pem_text(FIELD_PUBLIC_KEY, encoded)?)
}
