//! Test helpers and fixtures

use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::Config;
use crate::core_identity::*;

/// Config rooted in `dir`: `<dir>/keys` and `<dir>/.env`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.keys.key_dir = dir.path().join("keys");
    config.keys.env_file = dir.path().join(".env");
    config
}

pub fn env_path(dir: &TempDir) -> PathBuf {
    dir.path().join(".env")
}

/// Provision into `<dir>/keys` and `<dir>/.env`
pub fn provision_into(dir: &TempDir) -> (EnvFileKeystore, KeyRecord) {
    let keystore = EnvFileKeystore::open(env_path(dir)).unwrap();
    let record = Provisioner::new(PemKeyFiles::new(dir.path().join("keys")), &keystore)
        .provision()
        .unwrap();
    (keystore, record)
}

/// Replace the character at `index` with a different base64 alphabet character
pub fn flip_base64_char(encoded: &str, index: usize) -> String {
    let mut chars: Vec<char> = encoded.chars().collect();
    chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}
