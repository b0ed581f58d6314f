use std::collections::HashMap;
use std::sync::RwLock;

use super::{StoreError, TokenStore};
use crate::domain::oauth::TokenRecord;

/// Process-memory store for session-scoped credentials (Azure AD sign-in).
/// Nothing written here survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, app_key: &str, record: &TokenRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(app_key.to_string(), record.clone());
        Ok(())
    }

    fn load(&self, app_key: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(app_key)
            .cloned())
    }

    fn clear(&self, app_key: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .remove(app_key);
        Ok(())
    }
}
