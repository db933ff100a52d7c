//! SSI key management for the MediChain portal
//!
//! Provisions the Ed25519 signing key, verifies it, and serves it for
//! signing and DID document export.

pub mod config;
pub mod core_identity;
pub mod logging;

pub use config::{Config, ConfigError};
pub use core_identity::{
    DidMethod, IdentityError, KeyId, Provisioner, SsiKeys, VerificationResult, Verifier,
};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = DidMethod::Key;
        let _ = Config::default();
    }
}
