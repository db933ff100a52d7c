//! Errors raised while loading, overriding or saving [`Config`](super::Config)

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}", path.display())]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write config file {}", path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed TOML in {}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode config as TOML")]
    SerializeError(#[from] toml::ser::Error),

    /// An environment override could not be interpreted
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    ValidationFailed(String),
}
