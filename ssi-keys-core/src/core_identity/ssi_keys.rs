//! SSI key service
//!
//! Long-lived holder of the portal's signing key. Keys come from the
//! configuration store first and from the PEM files in the key directory
//! second; the service then signs payloads, checks detached signatures and
//! exports the key as a DID document.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::did::{DidDocument, DidMethod};
use super::error::IdentityError;
use super::key_id::KeyId;
use super::keypair::{KeyAlgorithm, SsiKeypair, SsiPublicKey};
use super::keystore::{EnvFileKeystore, Keystore, PemKeyFiles};
use super::provisioner::Provisioner;
use super::signatures::DigitalSignature;
use crate::config::Config;

/// Where the loaded key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Base64 record in the configuration store
    Store,
    /// `ssi_private.pem` / `ssi_public.pem` in the key directory
    PemFiles,
}

pub struct SsiKeys {
    keypair: SsiKeypair,
    public_key: SsiPublicKey,
    key_id: KeyId,
    algorithm: KeyAlgorithm,
    generated_at: Option<DateTime<Utc>>,
    source: KeySource,
    web_domain: String,
}

impl SsiKeys {
    /// Load the key named by `config`.
    ///
    /// Fails with [`IdentityError::ConfigurationMissing`] when neither the
    /// store nor the key directory holds a key.
    pub fn load(config: &Config) -> Result<Self, IdentityError> {
        let keystore = EnvFileKeystore::open(&config.keys.env_file)?;
        let pem_files = PemKeyFiles::new(&config.keys.key_dir);
        Self::load_from(&keystore, &pem_files, &config.did.web_domain)
    }

    /// Like [`SsiKeys::load`], provisioning a fresh key when none exists
    pub fn load_or_provision(config: &Config) -> Result<Self, IdentityError> {
        let keystore = EnvFileKeystore::open(&config.keys.env_file)?;
        let pem_files = PemKeyFiles::new(&config.keys.key_dir);

        if !keystore.has_record()? && !pem_files.exists() {
            warn!(
                env_file = %config.keys.env_file.display(),
                key_dir = %config.keys.key_dir.display(),
                "No SSI keys found, provisioning a new keypair"
            );
            Provisioner::new(pem_files.clone(), &keystore).provision()?;
        }

        Self::load_from(&keystore, &pem_files, &config.did.web_domain)
    }

    /// Load from explicit sources
    pub fn load_from(
        keystore: &dyn Keystore,
        pem_files: &PemKeyFiles,
        web_domain: &str,
    ) -> Result<Self, IdentityError> {
        let keys = if keystore.has_record()? {
            let record = keystore.load_record()?;
            let keypair = record.decode_keypair()?;
            let public_key = record.decode_public_key()?;
            Self::assemble(
                keypair,
                public_key,
                Some(record.key_id().clone()),
                record.algorithm(),
                record.generated_at(),
                KeySource::Store,
                web_domain,
            )?
        } else if pem_files.exists() {
            let (private_pem, public_pem) = pem_files.read()?;
            let keypair = SsiKeypair::from_pkcs8_pem(&private_pem)?;
            let public_key = SsiPublicKey::from_spki_pem(&public_pem)?;
            let algorithm = keypair.algorithm();
            Self::assemble(
                keypair,
                public_key,
                None,
                algorithm,
                None,
                KeySource::PemFiles,
                web_domain,
            )?
        } else {
            return Err(IdentityError::ConfigurationMissing(format!(
                "no SSI keys in the configuration store or in {}",
                pem_files.key_dir().display()
            )));
        };

        info!(key_id = %keys.key_id, source = ?keys.source, "Loaded SSI keys");
        Ok(keys)
    }

    fn assemble(
        keypair: SsiKeypair,
        public_key: SsiPublicKey,
        stored_key_id: Option<KeyId>,
        algorithm: KeyAlgorithm,
        generated_at: Option<DateTime<Utc>>,
        source: KeySource,
        web_domain: &str,
    ) -> Result<Self, IdentityError> {
        if keypair.public_key() != public_key {
            return Err(IdentityError::KeyParse(
                "private key does not belong to the stored public key".to_string(),
            ));
        }

        let key_id = public_key.key_id()?;
        if let Some(stored) = stored_key_id {
            if stored != key_id {
                return Err(IdentityError::KeyParse(format!(
                    "stored public key does not match key id {} (fingerprint is {})",
                    stored, key_id
                )));
            }
        }

        Ok(Self {
            keypair,
            public_key,
            key_id,
            algorithm,
            generated_at,
            source,
            web_domain: web_domain.to_string(),
        })
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Generation time; unknown for keys loaded from the PEM files
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn public_key(&self) -> &SsiPublicKey {
        &self.public_key
    }

    pub fn public_key_pem(&self) -> Result<String, IdentityError> {
        self.public_key.to_spki_pem()
    }

    /// Base64 of the Ed25519 signature over `data`
    pub fn sign_data(&self, data: &[u8]) -> String {
        let signature = self.keypair.sign(data);
        debug!(key_id = %self.key_id, len = data.len(), "Signed data");
        BASE64.encode(signature.to_bytes())
    }

    /// Check a base64 signature over `data` against the loaded public key.
    ///
    /// Malformed input verifies as false.
    pub fn verify_signature(&self, data: &[u8], signature_b64: &str) -> bool {
        let signature = match BASE64.decode(signature_b64.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Signature is not valid base64");
                return false;
            }
        };
        if signature.len() != ed25519_dalek::SIGNATURE_LENGTH {
            warn!(len = signature.len(), "Signature has the wrong length");
            return false;
        }
        self.public_key.verify_bytes(data, &signature)
    }

    /// Sign `data` and bundle the signature with the verifying key
    pub fn create_digital_signature(&self, data: &[u8]) -> Result<DigitalSignature, IdentityError> {
        Ok(DigitalSignature {
            signature: self.sign_data(data),
            algorithm: self.algorithm.display_name().to_string(),
            public_key: self.public_key_pem()?,
            timestamp: Utc::now(),
            key_id: self.key_id.clone(),
            key_type: self.algorithm,
        })
    }

    pub fn export_did_document(&self, method: &DidMethod) -> Result<DidDocument, IdentityError> {
        DidDocument::build(method, &self.public_key, &self.key_id, &self.web_domain)
    }
}

impl std::fmt::Debug for SsiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsiKeys")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::keystore::{MemoryKeystore, FIELD_KEY_ID, FIELD_PUBLIC_KEY};
    use crate::core_identity::record::KeyRecord;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.keys.key_dir = dir.path().join("keys");
        config.keys.env_file = dir.path().join(".env");
        config
    }

    fn store_with_key() -> (MemoryKeystore, SsiKeypair) {
        let keystore = MemoryKeystore::new();
        let keypair = SsiKeypair::generate();
        let record = KeyRecord::from_keypair(&keypair, Utc::now()).unwrap();
        keystore.save_record(&record).unwrap();
        (keystore, keypair)
    }

    #[test]
    fn test_load_from_store() {
        let dir = TempDir::new().unwrap();
        let (keystore, keypair) = store_with_key();

        let keys = SsiKeys::load_from(&keystore, &PemKeyFiles::new(dir.path()), "example.org").unwrap();
        assert_eq!(keys.source(), KeySource::Store);
        assert_eq!(keys.key_id(), &keypair.public_key().key_id().unwrap());
        assert!(keys.generated_at().is_some());
        assert_eq!(keys.algorithm(), KeyAlgorithm::Ed25519);
    }

    #[test]
    fn test_pem_fallback() {
        let dir = TempDir::new().unwrap();
        let pem_files = PemKeyFiles::new(dir.path());
        let keypair = SsiKeypair::generate();
        pem_files
            .write(
                &keypair.private_key_pem().unwrap(),
                &keypair.public_key().to_spki_pem().unwrap(),
            )
            .unwrap();

        let keys = SsiKeys::load_from(&MemoryKeystore::new(), &pem_files, "example.org").unwrap();
        assert_eq!(keys.source(), KeySource::PemFiles);
        assert_eq!(keys.key_id(), &keypair.public_key().key_id().unwrap());
        assert!(keys.generated_at().is_none());
    }

    #[test]
    fn test_no_keys_anywhere() {
        let dir = TempDir::new().unwrap();
        let err = SsiKeys::load(&config_in(&dir)).unwrap_err();
        assert!(matches!(err, IdentityError::ConfigurationMissing(_)));
    }

    #[test]
    fn test_load_or_provision_creates_keys_once() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let first = SsiKeys::load_or_provision(&config).unwrap();
        assert!(config.keys.env_file.is_file());
        assert!(PemKeyFiles::new(&config.keys.key_dir).exists());

        let second = SsiKeys::load_or_provision(&config).unwrap();
        assert_eq!(first.key_id(), second.key_id());

        let loaded = SsiKeys::load(&config).unwrap();
        assert_eq!(loaded.key_id(), first.key_id());
    }

    #[test]
    fn test_sign_and_verify() {
        let (keystore, _) = store_with_key();
        let dir = TempDir::new().unwrap();
        let keys = SsiKeys::load_from(&keystore, &PemKeyFiles::new(dir.path()), "example.org").unwrap();

        let sig = keys.sign_data(b"prescription #42");
        assert!(keys.verify_signature(b"prescription #42", &sig));
        assert!(!keys.verify_signature(b"prescription #43", &sig));
    }

    #[test]
    fn test_verify_signature_rejects_malformed_input() {
        let (keystore, _) = store_with_key();
        let dir = TempDir::new().unwrap();
        let keys = SsiKeys::load_from(&keystore, &PemKeyFiles::new(dir.path()), "example.org").unwrap();

        assert!(!keys.verify_signature(b"data", "***not base64***"));
        assert!(!keys.verify_signature(b"data", &BASE64.encode([0u8; 10])));
        assert!(!keys.verify_signature(b"data", ""));
    }

    #[test]
    fn test_mismatched_store_is_parse_error() {
        let (keystore, _) = store_with_key();
        let (other, _) = store_with_key();
        let foreign_public = other.field(FIELD_PUBLIC_KEY).unwrap().unwrap();
        keystore.set_field(FIELD_PUBLIC_KEY, &foreign_public).unwrap();
        keystore.remove_field(FIELD_KEY_ID).unwrap();

        let dir = TempDir::new().unwrap();
        let err = SsiKeys::load_from(&keystore, &PemKeyFiles::new(dir.path()), "example.org").unwrap_err();
        assert!(matches!(err, IdentityError::KeyParse(_)));
    }

    #[test]
    fn test_digital_signature_envelope() {
        let (keystore, _) = store_with_key();
        let dir = TempDir::new().unwrap();
        let keys = SsiKeys::load_from(&keystore, &PemKeyFiles::new(dir.path()), "example.org").unwrap();

        let envelope = keys.create_digital_signature(b"lab result").unwrap();
        assert_eq!(envelope.algorithm, "Ed25519");
        assert_eq!(envelope.key_type, KeyAlgorithm::Ed25519);
        assert_eq!(&envelope.key_id, keys.key_id());
        assert_eq!(envelope.public_key, keys.public_key_pem().unwrap());
        assert!(keys.verify_signature(b"lab result", &envelope.signature));
    }

    #[test]
    fn test_did_web_uses_configured_domain() {
        let (keystore, _) = store_with_key();
        let dir = TempDir::new().unwrap();
        let keys = SsiKeys::load_from(&keystore, &PemKeyFiles::new(dir.path()), "clinic.example").unwrap();

        let doc = keys.export_did_document(&DidMethod::Web).unwrap();
        assert_eq!(doc.id, "did:web:clinic.example");
        assert!(doc.verification_method[0].id.ends_with(keys.key_id().as_str()));
    }

    #[test]
    fn test_store_takes_precedence_over_pem_files() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let stale = SsiKeypair::generate();
        PemKeyFiles::new(&config.keys.key_dir)
            .write(
                &stale.private_key_pem().unwrap(),
                &stale.public_key().to_spki_pem().unwrap(),
            )
            .unwrap();

        let current = SsiKeypair::generate();
        let record = KeyRecord::from_keypair(&current, Utc::now()).unwrap();
        EnvFileKeystore::open(&config.keys.env_file)
            .unwrap()
            .save_record(&record)
            .unwrap();

        let keys = SsiKeys::load(&config).unwrap();
        assert_eq!(keys.key_id(), &current.public_key().key_id().unwrap());
        assert!(fs::read_to_string(&config.keys.env_file)
            .unwrap()
            .contains(keys.key_id().as_str()));
    }
}
