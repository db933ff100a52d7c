//! PEM key files in the key directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use super::write_atomic;

pub const PRIVATE_KEY_FILE: &str = "ssi_private.pem";
pub const PUBLIC_KEY_FILE: &str = "ssi_public.pem";

const PRIVATE_KEY_MODE: u32 = 0o600;
const PUBLIC_KEY_MODE: u32 = 0o644;

/// The `ssi_private.pem` / `ssi_public.pem` pair under one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemKeyFiles {
    key_dir: PathBuf,
}

impl PemKeyFiles {
    pub fn new(key_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: key_dir.into(),
        }
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.key_dir.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.key_dir.join(PUBLIC_KEY_FILE)
    }

    /// Both files present
    pub fn exists(&self) -> bool {
        self.private_key_path().is_file() && self.public_key_path().is_file()
    }

    /// Write both files, creating the key directory if needed.
    ///
    /// The private key file is owner-only on Unix.
    pub fn write(&self, private_pem: &str, public_pem: &str) -> io::Result<()> {
        fs::create_dir_all(&self.key_dir)?;
        write_atomic(&self.private_key_path(), private_pem.as_bytes(), PRIVATE_KEY_MODE)?;
        write_atomic(&self.public_key_path(), public_pem.as_bytes(), PUBLIC_KEY_MODE)?;
        Ok(())
    }

    /// Read both files as text: `(private_pem, public_pem)`
    pub fn read(&self) -> io::Result<(Zeroizing<String>, String)> {
        let private_pem = Zeroizing::new(fs::read_to_string(self.private_key_path())?);
        let public_pem = fs::read_to_string(self.public_key_path())?;
        Ok((private_pem, public_pem))
    }
}
