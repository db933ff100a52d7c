//! Configuration management
//!
//! Settings are resolved once at process start (defaults, then an optional
//! TOML file, then environment overrides) into a [`Config`] that is passed
//! explicitly to the provisioner, the verifier and the key service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

mod error;

pub use error::ConfigError;

/// Default directory for `ssi_private.pem` / `ssi_public.pem`
pub const DEFAULT_KEY_DIR: &str = "keys";

/// Default key-value store holding the base64 key record
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const DEFAULT_WEB_DOMAIN: &str = "medichain.example.com";

/// Environment variables consulted by [`Config::from_env`]
pub const ENV_KEY_DIR: &str = "SSI_KEYS_KEY_DIR";
pub const ENV_ENV_FILE: &str = "SSI_KEYS_ENV_FILE";
pub const ENV_WEB_DOMAIN: &str = "SSI_WEB_DOMAIN";
pub const ENV_LOG_LEVEL: &str = "SSI_KEYS_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "SSI_KEYS_LOG_JSON";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keys: KeysConfig,
    pub did: DidConfig,
    pub logging: LoggingConfig,
}

/// Where key material is persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Directory holding the PEM key files; created on provisioning
    pub key_dir: PathBuf,

    /// `NAME=value` store receiving the base64 key record
    pub env_file: PathBuf,
}

/// DID document export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DidConfig {
    /// Host name used for `did:web` identifiers
    pub web_domain: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from(DEFAULT_KEY_DIR),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
        }
    }
}

impl Default for DidConfig {
    fn default() -> Self {
        Self {
            web_domain: DEFAULT_WEB_DOMAIN.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().collect();
        let mut config = Self::default();
        config.apply_overrides(&vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self =
            toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `SSI_KEYS_*` style overrides from a variable map.
    ///
    /// Unset variables leave the current value untouched.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(dir) = vars.get(ENV_KEY_DIR) {
            self.keys.key_dir = PathBuf::from(dir);
        }
        if let Some(file) = vars.get(ENV_ENV_FILE) {
            self.keys.env_file = PathBuf::from(file);
        }
        if let Some(domain) = vars.get(ENV_WEB_DOMAIN) {
            self.did.web_domain = domain.clone();
        }
        if let Some(level) = vars.get(ENV_LOG_LEVEL) {
            self.logging.level = level.to_ascii_lowercase();
        }
        if let Some(json) = vars.get(ENV_LOG_JSON) {
            self.logging.json_format = json
                .parse()
                .map_err(|e: std::str::ParseBoolError| ConfigError::InvalidValue {
                    var: ENV_LOG_JSON,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.key_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "keys.key_dir must not be empty".to_string(),
            ));
        }

        if self.keys.env_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "keys.env_file must not be empty".to_string(),
            ));
        }

        let domain = self.did.web_domain.trim();
        if domain.is_empty() || domain.contains('/') || domain.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationFailed(format!(
                "did.web_domain must be a bare host name, got {:?}",
                self.did.web_domain
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::FileWriteError {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}
