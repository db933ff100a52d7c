//! DID document export
//!
//! Builds a W3C DID document with a single `Ed25519VerificationKey2020`
//! verification method for the SSI key. `did:key` identifiers embed the key
//! as a base58btc multibase string with the `ed25519-pub` multicodec prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::key_id::KeyId;
use super::keypair::SsiPublicKey;
use super::error::IdentityError;

pub const DID_CONTEXT_V1: &str = "https://www.w3.org/ns/did/v1";
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
pub const VERIFICATION_KEY_TYPE: &str = "Ed25519VerificationKey2020";

/// Multicodec varint for `ed25519-pub` (0xed)
const ED25519_PUB_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// DID method used for the exported identifier
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DidMethod {
    #[default]
    Key,
    Web,
    /// Any other method; the key id becomes the method-specific id
    Other(String),
}

impl FromStr for DidMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return Err(format!("invalid DID method name {:?}", s));
        }
        Ok(match s {
            "key" => DidMethod::Key,
            "web" => DidMethod::Web,
            other => DidMethod::Other(other.to_string()),
        })
    }
}

impl fmt::Display for DidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DidMethod::Key => f.write_str("key"),
            DidMethod::Web => f.write_str("web"),
            DidMethod::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_pem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
    pub assertion_method: Vec<String>,
    pub capability_invocation: Vec<String>,
    pub capability_delegation: Vec<String>,
}

/// `z` + base58btc(0xed 0x01 || raw public key)
pub fn public_key_multibase(public_key: &SsiPublicKey) -> String {
    let mut bytes = Vec::with_capacity(2 + 32);
    bytes.extend_from_slice(&ED25519_PUB_MULTICODEC);
    bytes.extend_from_slice(&public_key.to_bytes());
    format!("z{}", bs58::encode(bytes).into_string())
}

impl DidDocument {
    pub fn build(
        method: &DidMethod,
        public_key: &SsiPublicKey,
        key_id: &KeyId,
        web_domain: &str,
    ) -> Result<Self, IdentityError> {
        let (did, multibase, pem) = match method {
            DidMethod::Key => {
                let multibase = public_key_multibase(public_key);
                (format!("did:key:{}", multibase), Some(multibase), None)
            }
            DidMethod::Web => (
                format!("did:web:{}", web_domain),
                None,
                Some(public_key.to_spki_pem()?),
            ),
            DidMethod::Other(name) => (
                format!("did:{}:{}", name, key_id),
                None,
                Some(public_key.to_spki_pem()?),
            ),
        };

        let vm_id = format!("{}#{}", did, key_id);
        let reference = vec![vm_id.clone()];

        Ok(Self {
            context: vec![DID_CONTEXT_V1.to_string(), ED25519_2020_CONTEXT.to_string()],
            verification_method: vec![VerificationMethod {
                id: vm_id,
                method_type: VERIFICATION_KEY_TYPE.to_string(),
                controller: did.clone(),
                public_key_multibase: multibase,
                public_key_pem: pem,
            }],
            authentication: reference.clone(),
            assertion_method: reference.clone(),
            capability_invocation: reference.clone(),
            capability_delegation: reference,
            id: did,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::keypair::SsiKeypair;

    fn fixture() -> (SsiPublicKey, KeyId) {
        let public = SsiKeypair::generate().public_key();
        let key_id = public.key_id().unwrap();
        (public, key_id)
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("key".parse::<DidMethod>().unwrap(), DidMethod::Key);
        assert_eq!("web".parse::<DidMethod>().unwrap(), DidMethod::Web);
        assert_eq!(
            "ion".parse::<DidMethod>().unwrap(),
            DidMethod::Other("ion".to_string())
        );
        assert!("".parse::<DidMethod>().is_err());
        assert!("did:key".parse::<DidMethod>().is_err());
        assert_eq!(DidMethod::Other("cheqd".to_string()).to_string(), "cheqd");
    }

    #[test]
    fn test_multibase_roundtrips_to_raw_key() {
        let (public, _) = fixture();
        let multibase = public_key_multibase(&public);
        assert!(multibase.starts_with("z6Mk"));

        let decoded = bs58::decode(&multibase[1..]).into_vec().unwrap();
        assert_eq!(&decoded[..2], &ED25519_PUB_MULTICODEC);
        assert_eq!(&decoded[2..], &public.to_bytes());
    }

    #[test]
    fn test_did_key_document() {
        let (public, key_id) = fixture();
        let doc = DidDocument::build(&DidMethod::Key, &public, &key_id, "unused").unwrap();

        assert!(doc.id.starts_with("did:key:z6Mk"));
        let vm = &doc.verification_method[0];
        assert_eq!(vm.id, format!("{}#{}", doc.id, key_id));
        assert_eq!(vm.controller, doc.id);
        assert_eq!(vm.method_type, VERIFICATION_KEY_TYPE);
        assert!(vm.public_key_multibase.is_some());
        assert!(vm.public_key_pem.is_none());
        assert_eq!(doc.authentication, vec![vm.id.clone()]);
        assert_eq!(doc.capability_delegation, vec![vm.id.clone()]);
    }

    #[test]
    fn test_did_web_document() {
        let (public, key_id) = fixture();
        let doc = DidDocument::build(&DidMethod::Web, &public, &key_id, "portal.example").unwrap();

        assert_eq!(doc.id, "did:web:portal.example");
        let vm = &doc.verification_method[0];
        assert!(vm.public_key_pem.as_deref().unwrap().starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(vm.public_key_multibase.is_none());
    }

    #[test]
    fn test_other_method_uses_key_id() {
        let (public, key_id) = fixture();
        let method = DidMethod::Other("ion".to_string());
        let doc = DidDocument::build(&method, &public, &key_id, "unused").unwrap();
        assert_eq!(doc.id, format!("did:ion:{}", key_id));
    }

    #[test]
    fn test_json_shape() {
        let (public, key_id) = fixture();
        let doc = DidDocument::build(&DidMethod::Key, &public, &key_id, "unused").unwrap();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["@context"][0], DID_CONTEXT_V1);
        assert_eq!(json["@context"][1], ED25519_2020_CONTEXT);
        assert_eq!(json["verificationMethod"][0]["type"], VERIFICATION_KEY_TYPE);
        assert!(json["verificationMethod"][0].get("publicKeyPem").is_none());
        assert!(json["assertionMethod"].is_array());
        assert!(json["capabilityInvocation"].is_array());
    }
}
