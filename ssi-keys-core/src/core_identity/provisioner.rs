//! Key provisioning
//!
//! Generates the SSI keypair and persists it in two places: the PEM files in
//! the key directory and the base64 record in the configuration store.
//! Re-running rotates the key; the previous public key stops verifying.
//!
//! The two writes are not transactional. If the store update fails after the
//! PEM files were written, the files hold the new key while the store still
//! holds the old one.

use chrono::Utc;
use tracing::info;

use super::error::IdentityError;
use super::keypair::SsiKeypair;
use super::keystore::{Keystore, PemKeyFiles};
use super::record::KeyRecord;

pub struct Provisioner<'a> {
    pem_files: PemKeyFiles,
    keystore: &'a dyn Keystore,
}

impl<'a> Provisioner<'a> {
    pub fn new(pem_files: PemKeyFiles, keystore: &'a dyn Keystore) -> Self {
        Self {
            pem_files,
            keystore,
        }
    }

    pub fn pem_files(&self) -> &PemKeyFiles {
        &self.pem_files
    }

    /// Generate a keypair and persist it, returning the stored record
    pub fn provision(&self) -> Result<KeyRecord, IdentityError> {
        self.provision_keypair(SsiKeypair::generate())
    }

    /// Persist a caller-supplied keypair
    pub fn provision_keypair(&self, keypair: SsiKeypair) -> Result<KeyRecord, IdentityError> {
        let public_key = keypair.public_key();
        let private_pem = keypair.private_key_pem()?;
        let public_pem = public_key.to_spki_pem()?;

        self.pem_files.write(&private_pem, &public_pem)?;
        info!(
            key_dir = %self.pem_files.key_dir().display(),
            "Wrote SSI key files"
        );

        let record = KeyRecord::from_keypair(&keypair, Utc::now())?;
        self.keystore.save_record(&record)?;
        info!(key_id = %record.key_id(), algorithm = %record.algorithm(), "Stored SSI key record");

        Ok(record)
    }
}
