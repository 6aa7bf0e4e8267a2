//! Key-value persistence seam behind the cart stores.

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Raw key-value persistence backend.
///
/// The cart stores are agnostic to the on-disk format; any key-value
/// or document store that can get, set, and delete byte values fits.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read the value for a key, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. No-op if absent.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend (for development/testing).
#[derive(Default)]
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = InMemoryBackend::new();
        backend.set("k", b"value").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let backend = InMemoryBackend::new();
        assert_eq!(backend.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = InMemoryBackend::new();
        backend.set("k", b"value").await.unwrap();
        backend.delete("k").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }
}
