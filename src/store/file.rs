//! File-backed store adapter: one JSON blob per key.
//!
//! Writes go to a temp file in the same directory and are renamed into place,
//! so a crash mid-write leaves the previous record readable. The rename is
//! the durability point; `put` does not acknowledge before it completes.

use crate::error::StoreError;
use crate::model::{ShortCode, UrlRecord};
use crate::store::StateStore;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &ShortCode) -> Result<PathBuf, StoreError> {
        // Codes double as file names; refuse anything that could escape the
        // store directory.
        if !key.as_str().chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StoreError::Unavailable(format!(
                "key {key} is not file-safe"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &ShortCode) -> Result<Option<UrlRecord>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &ShortCode, record: &UrlRecord) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();
        let bytes = serde_json::to_vec_pretty(record)?;
        let key_display = key.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
            debug!(key = %key_display, path = %path.display(), "record persisted");
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store write task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = ShortCode::from("abc123");
        let rec = UrlRecord {
            short_code: key.clone(),
            full_url: "https://example.com/a".to_string(),
        };

        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.put(&key, &rec).await.unwrap();
        }

        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn rejects_unsafe_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let err = store.get(&ShortCode::from("../etc/passwd")).await;
        assert!(err.is_err());
    }
}
