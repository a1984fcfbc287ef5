use std::cell::RefCell;

use gloo::storage::{errors::StorageError, LocalStorage, Storage};
use log::error;

/// Local storage key holding the id of the last connected provider.
pub const CACHED_PROVIDER_KEY: &str = "wallet-connector:cached-provider";

/// Persists the identifier of the last used provider.
pub trait ProviderCache {
    fn load(&self) -> Option<String>;

    fn store(&self, provider_id: &str) -> Result<(), StorageError>;

    fn clear(&self);
}

/// Browser `localStorage` backed cache.
#[derive(Debug, Clone)]
pub struct LocalStorageCache {
    key: String,
}

impl LocalStorageCache {
    pub fn new() -> Self {
        Self::with_key(CACHED_PROVIDER_KEY)
    }

    pub fn with_key(key: &str) -> Self {
        Self { key: key.to_string() }
    }
}

impl Default for LocalStorageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderCache for LocalStorageCache {
    fn load(&self) -> Option<String> {
        match LocalStorage::get::<String>(&self.key) {
            Ok(id) => Some(id),
            Err(StorageError::KeyNotFound(_)) => None,
            Err(err) => {
                error!("Failed to read cached provider: {err}");
                None
            }
        }
    }

    fn store(&self, provider_id: &str) -> Result<(), StorageError> {
        LocalStorage::set(&self.key, provider_id)
    }

    fn clear(&self) {
        LocalStorage::delete(&self.key);
    }
}

/// In-memory cache, for hosts without `localStorage` and for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    value: RefCell<Option<String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderCache for MemoryCache {
    fn load(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    fn store(&self, provider_id: &str) -> Result<(), StorageError> {
        *self.value.borrow_mut() = Some(provider_id.to_string());
        Ok(())
    }

    fn clear(&self) {
        self.value.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.load(), None);
        cache.store("injected").unwrap();
        assert_eq!(cache.load().as_deref(), Some("injected"));
        cache.clear();
        assert_eq!(cache.load(), None);
    }
}
