//! Keystore module
//!
//! Persistence of the SSI key record. A keystore is a flat field map holding
//! the five `SSI_*` fields; [`EnvFileKeystore`] backs it with a `NAME=value`
//! text file, [`MemoryKeystore`] keeps it in process. The PEM key files are
//! written separately by [`PemKeyFiles`].

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::record::KeyRecord;

pub mod env_file;
pub mod memory_keystore;
pub mod pem_files;

pub use env_file::{EnvFile, EnvFileKeystore};
pub use memory_keystore::MemoryKeystore;
pub use pem_files::{PemKeyFiles, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};

/// Base64 of the PKCS#8 PEM private key
pub const FIELD_PRIVATE_KEY: &str = "SSI_PRIVATE_KEY";
/// Base64 of the SPKI PEM public key
pub const FIELD_PUBLIC_KEY: &str = "SSI_PUBLIC_KEY";
pub const FIELD_KEY_ID: &str = "SSI_KEY_ID";
pub const FIELD_KEY_TYPE: &str = "SSI_KEY_TYPE";
pub const FIELD_GENERATED_AT: &str = "SSI_KEY_GENERATED_AT";

/// Every field a key record occupies, in write order
pub const RECORD_FIELDS: [&str; 5] = [
    FIELD_PRIVATE_KEY,
    FIELD_PUBLIC_KEY,
    FIELD_KEY_ID,
    FIELD_KEY_TYPE,
    FIELD_GENERATED_AT,
];

/// Keystore errors
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("required field {0} is not set")]
    MissingField(&'static str),

    #[error("field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage of one SSI key record
pub trait Keystore: Send + Sync {
    /// Load the stored record.
    ///
    /// Fails with [`KeystoreError::MissingField`] when the private or public
    /// key is absent.
    fn load_record(&self) -> Result<KeyRecord, KeystoreError>;

    /// Upsert every field of `record`, replacing values in place
    fn save_record(&self, record: &KeyRecord) -> Result<(), KeystoreError>;

    /// Whether both the private and the public key hold a non-blank value.
    ///
    /// Stray `SSI_KEY_ID` or `SSI_KEY_TYPE` lines, or empty key
    /// placeholders, do not count as a record.
    fn has_record(&self) -> Result<bool, KeystoreError>;
}

/// A stored value counts as set only when it is not blank
pub(crate) fn is_set(value: Option<&str>) -> bool {
    value.map_or(false, |v| !v.trim().is_empty())
}

/// The private and public key fields are both set
pub(crate) fn has_key_pair<'a, F>(get: F) -> bool
where
    F: Fn(&str) -> Option<&'a str>,
{
    is_set(get(FIELD_PRIVATE_KEY)) && is_set(get(FIELD_PUBLIC_KEY))
}

/// Write `data` to `path` by writing a sibling temp file and renaming it over
/// the target. `mode` applies to the new file on Unix.
pub(crate) fn write_atomic(path: &Path, data: &[u8], mode: u32) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts.open(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // `mode` only applies when the temp file is created; a stale temp file
    // left by an interrupted run keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
