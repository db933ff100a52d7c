//! In-memory keystore (non-persistent, for tests and embedding)

use super::{has_key_pair, Keystore, KeystoreError};
use crate::core_identity::record::KeyRecord;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

fn handle_poison<T>(_err: PoisonError<T>) -> KeystoreError {
    KeystoreError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "memory keystore lock poisoned: a thread panicked while holding it",
    ))
}

/// Field map shared between clones
#[derive(Clone, Default)]
pub struct MemoryKeystore {
    fields: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw field access, bypassing record validation
    pub fn field(&self, name: &str) -> Result<Option<String>, KeystoreError> {
        Ok(self.fields.read().map_err(handle_poison)?.get(name).cloned())
    }

    pub fn set_field(&self, name: &str, value: &str) -> Result<(), KeystoreError> {
        self.fields
            .write()
            .map_err(handle_poison)?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_field(&self, name: &str) -> Result<(), KeystoreError> {
        self.fields.write().map_err(handle_poison)?.remove(name);
        Ok(())
    }
}

impl Keystore for MemoryKeystore {
    fn load_record(&self) -> Result<KeyRecord, KeystoreError> {
        let fields = self.fields.read().map_err(handle_poison)?;
        KeyRecord::from_fields(|name| fields.get(name).cloned())
    }

    fn save_record(&self, record: &KeyRecord) -> Result<(), KeystoreError> {
        let mut fields = self.fields.write().map_err(handle_poison)?;
        record.write_fields(|name, value| {
            fields.insert(name.to_string(), value.to_string());
        });
        Ok(())
    }

    fn has_record(&self) -> Result<bool, KeystoreError> {
        let fields = self.fields.read().map_err(handle_poison)?;
        Ok(has_key_pair(|name| fields.get(name).map(String::as_str)))
    }
}

impl std::fmt::Debug for MemoryKeystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .fields
            .read()
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("MemoryKeystore").field("fields", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::keypair::SsiKeypair;
    use crate::core_identity::keystore::{FIELD_KEY_ID, FIELD_PRIVATE_KEY, FIELD_PUBLIC_KEY};
    use chrono::Utc;

    #[test]
    fn test_save_and_load_record() {
        let keystore = MemoryKeystore::new();
        let record = KeyRecord::from_keypair(&SsiKeypair::generate(), Utc::now()).unwrap();

        keystore.save_record(&record).unwrap();
        let loaded = keystore.load_record().unwrap();

        assert_eq!(loaded.key_id(), record.key_id());
        assert_eq!(loaded.public_key_base64(), record.public_key_base64());
    }

    #[test]
    fn test_clones_share_state() {
        let keystore = MemoryKeystore::new();
        let clone = keystore.clone();
        clone.set_field(FIELD_KEY_ID, "0123456789abcdef").unwrap();

        assert_eq!(
            keystore.field(FIELD_KEY_ID).unwrap().as_deref(),
            Some("0123456789abcdef")
        );
    }

    #[test]
    fn test_has_record_needs_both_keys() {
        let keystore = MemoryKeystore::new();
        keystore.set_field(FIELD_KEY_ID, "0123456789abcdef").unwrap();
        keystore.set_field(FIELD_PUBLIC_KEY, "cHVibGlj").unwrap();
        assert!(!keystore.has_record().unwrap());

        keystore.set_field(FIELD_PRIVATE_KEY, "   ").unwrap();
        assert!(!keystore.has_record().unwrap());

        keystore.set_field(FIELD_PRIVATE_KEY, "c2VjcmV0").unwrap();
        assert!(keystore.has_record().unwrap());
    }

    #[test]
    fn test_missing_private_key() {
        let keystore = MemoryKeystore::new();
        let record = KeyRecord::from_keypair(&SsiKeypair::generate(), Utc::now()).unwrap();
        keystore.save_record(&record).unwrap();
        keystore.remove_field(FIELD_PRIVATE_KEY).unwrap();

        assert!(matches!(
            keystore.load_record(),
            Err(KeystoreError::MissingField(FIELD_PRIVATE_KEY))
        ));
    }

    #[test]
    fn test_debug_lists_names_only() {
        let keystore = MemoryKeystore::new();
        keystore.set_field(FIELD_PRIVATE_KEY, "c2VjcmV0").unwrap();
        let debug_str = format!("{:?}", keystore);
        assert!(debug_str.contains(FIELD_PRIVATE_KEY));
        assert!(!debug_str.contains("c2VjcmV0"));
    }
}
