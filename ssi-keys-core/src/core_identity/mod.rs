//! Identity management module
//!
//! Lifecycle of the portal's Ed25519 SSI signing key:
//! - [`Provisioner`] generates a keypair and persists it as PEM files plus a
//!   base64 record in the `NAME=value` configuration store
//! - [`Verifier`] proves the stored pair still works by a sign/verify round
//! - [`SsiKeys`] loads the key for signing, signature checks and DID export

mod did;
mod error;
mod key_id;
mod keypair;
pub mod keystore;
mod provisioner;
mod record;
mod signatures;
mod ssi_keys;
mod verifier;

pub use did::{
    public_key_multibase, DidDocument, DidMethod, VerificationMethod, DID_CONTEXT_V1,
    ED25519_2020_CONTEXT, VERIFICATION_KEY_TYPE,
};
pub use error::IdentityError;
pub use key_id::{KeyId, KEY_ID_HEX_LEN};
pub use keypair::{KeyAlgorithm, SsiKeypair, SsiPublicKey};
pub use keystore::{
    EnvFile, EnvFileKeystore, Keystore, KeystoreError, MemoryKeystore, PemKeyFiles,
    FIELD_GENERATED_AT, FIELD_KEY_ID, FIELD_KEY_TYPE, FIELD_PRIVATE_KEY, FIELD_PUBLIC_KEY,
    PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, RECORD_FIELDS,
};
pub use provisioner::Provisioner;
pub use record::{format_timestamp, KeyRecord};
pub use signatures::DigitalSignature;
pub use ssi_keys::{KeySource, SsiKeys};
pub use verifier::{VerificationResult, Verifier, TEST_MESSAGE};

#[cfg(test)]
mod tests;
