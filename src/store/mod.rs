//! # State Store
//!
//! Durable key→blob persistence consumed by the registry. The contract is
//! deliberately small: `get` and `put`, keyed by [`ShortCode`], with
//! durability-before-acknowledgment semantics and no partial writes. The
//! registry never deletes — deactivation frees the in-memory instance only.
//!
//! Two adapters ship with the crate: [`MemoryStore`] for tests and
//! single-process runs, and [`JsonFileStore`] which persists one JSON blob
//! per key with a temp-file-and-rename write so a crash mid-write leaves the
//! prior value intact.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::model::{ShortCode, UrlRecord};
use async_trait::async_trait;

/// Durable key→record persistence.
///
/// `put` must not return `Ok` until the record is durable; a failed `put`
/// must leave the previously stored value readable. Key-miss on `get` is not
/// an error — it means the key was never written.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &ShortCode) -> Result<Option<UrlRecord>, StoreError>;

    async fn put(&self, key: &ShortCode, record: &UrlRecord) -> Result<(), StoreError>;
}
