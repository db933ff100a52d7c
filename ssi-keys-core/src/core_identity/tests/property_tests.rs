//! Properties of the key encodings

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use proptest::prelude::*;

use crate::core_identity::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Property: generate -> PEM -> base64 -> store -> decode -> parse keeps a working pair
    #[test]
    fn prop_stored_keys_sign_and_verify(message in prop::collection::vec(any::<u8>(), 0..512)) {
        let keystore = MemoryKeystore::new();
        let record = KeyRecord::from_keypair(&SsiKeypair::generate(), Utc::now()).unwrap();
        keystore.save_record(&record).unwrap();

        let loaded = keystore.load_record().unwrap();
        let keypair = loaded.decode_keypair().unwrap();
        let public_key = loaded.decode_public_key().unwrap();

        let signature = keypair.sign(&message);
        prop_assert!(public_key.verify(&message, &signature));
    }

    // Property: flipping any one byte of the message breaks the signature
    #[test]
    fn prop_tampered_message_fails(
        message in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let keypair = SsiKeypair::generate();
        let signature = keypair.sign(&message);

        let mut tampered = message.clone();
        let i = index.index(tampered.len());
        tampered[i] ^= mask;

        prop_assert!(!keypair.public_key().verify(&tampered, &signature));
    }

    // Property: another keypair's public key never verifies, and never errors
    #[test]
    fn prop_foreign_public_key_is_negative(message in prop::collection::vec(any::<u8>(), 0..128)) {
        let signer = SsiKeypair::generate();
        let other = SsiKeypair::generate();
        let sig = BASE64.encode(signer.sign(&message).to_bytes());
        let bytes = BASE64.decode(sig).unwrap();

        prop_assert!(!other.public_key().verify_bytes(&message, &bytes));
    }
}

#[test]
fn test_key_id_deterministic_and_distinct() {
    let a = SsiKeypair::generate().public_key();
    let b = SsiKeypair::generate().public_key();

    let pem = a.to_spki_pem().unwrap();
    let reparsed = SsiPublicKey::from_spki_pem(&pem).unwrap();

    assert_eq!(a.key_id().unwrap(), reparsed.key_id().unwrap());
    assert_ne!(a.key_id().unwrap(), b.key_id().unwrap());
}
