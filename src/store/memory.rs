//! In-memory store adapter. Holds encoded blobs rather than live records so
//! it exercises the same codec path as a real backend.

use crate::error::StoreError;
use crate::model::{ShortCode, UrlRecord};
use crate::store::StateStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Key→blob map behind a mutex. Call sites share one instance via `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<ShortCode, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored. Test/diagnostic helper.
    pub fn len(&self) -> usize {
        self.blobs.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &ShortCode) -> Result<Option<UrlRecord>, StoreError> {
        let blob = {
            let blobs = self.blobs.lock().expect("store mutex poisoned");
            blobs.get(key).cloned()
        };
        match blob {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &ShortCode, record: &UrlRecord) -> Result<(), StoreError> {
        // Encode outside the lock; insert is the atomic commit point.
        let bytes = serde_json::to_vec(record)?;
        let mut blobs = self.blobs.lock().expect("store mutex poisoned");
        blobs.insert(key.clone(), bytes);
        debug!(%key, "record persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, url: &str) -> UrlRecord {
        UrlRecord {
            short_code: ShortCode::from(code),
            full_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn get_miss_is_none_not_error() {
        let store = MemoryStore::new();
        let got = store.get(&ShortCode::from("nope")).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        let key = ShortCode::from("abc123");
        let rec = record("abc123", "https://example.com/");
        store.put(&key, &rec).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(rec));
    }
}
