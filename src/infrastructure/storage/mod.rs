pub mod file_token_store;
pub mod memory_token_store;

pub use file_token_store::FileTokenStore;
pub use memory_token_store::MemoryTokenStore;

use crate::domain::oauth::TokenRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("token store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("token store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("token store lock poisoned")]
    Poisoned,
}

/// Persistence for token records, keyed by application key.
///
/// Implementations must treat a missing record as a normal state: `load`
/// returns `Ok(None)` and `clear` succeeds.
pub trait TokenStore: Send + Sync {
    fn save(&self, app_key: &str, record: &TokenRecord) -> Result<(), StoreError>;
    fn load(&self, app_key: &str) -> Result<Option<TokenRecord>, StoreError>;
    fn clear(&self, app_key: &str) -> Result<(), StoreError>;
}
