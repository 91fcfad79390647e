//! # Error Taxonomy
//!
//! One error enum spans the registry, allocator, and service layers. Ownership
//! races (`StaleOwner`, `LostOwnership`, `OwnerUnreachable`) are retried
//! transparently inside the registry up to a bounded count; callers only see
//! them when the retry budget is exhausted. User-visible failures are limited
//! to malformed input, unknown codes, and transient server errors.

use crate::model::{Generation, NodeId, ShortCode};

/// Errors produced by the registry and everything layered on top of it.
#[derive(Debug, thiserror::Error)]
pub enum ShortenerError {
    /// Client input was not a well-formed absolute URI. Never retried.
    #[error("not a well-formed absolute URI: {0}")]
    InvalidUrl(String),

    /// No record has ever been written for this code. Maps to 404.
    #[error("no URL recorded for code {0}")]
    NotFound(ShortCode),

    /// The state store rejected or failed the write; in-memory state was
    /// rolled back, nothing was acknowledged.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// A forwarded call carried a generation that no longer matches the
    /// owner's. The caller must re-resolve ownership and retry.
    #[error("stale owner: call expected {expected}, instance holds {actual}")]
    StaleOwner {
        expected: Generation,
        actual: Generation,
    },

    /// An in-flight activation lost the ownership race to another node.
    #[error("lost ownership race during activation")]
    LostOwnership,

    /// The node the directory names as owner cannot be reached. A retry goes
    /// back through the directory, which reassigns at a higher generation.
    #[error("owner {0} unreachable")]
    OwnerUnreachable(NodeId),

    /// Every random candidate collided with an existing code. With sufficient
    /// entropy width this should be astronomically rare.
    #[error("code allocation exhausted after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    /// The instance's mailbox is gone (node shutting down).
    #[error("actor closed")]
    ActorClosed,

    /// The instance dropped the reply channel without answering.
    #[error("actor dropped response channel")]
    ActorDropped,
}

/// Failures from the durable key→blob store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Store explicitly refused the operation (used by fault-injecting
    /// test doubles as well as real backends).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures from the node directory's ownership protocol.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Another node won the claim race; the directory resolved it internally.
    #[error("key already owned by {owner} at {generation}")]
    AlreadyOwned {
        owner: NodeId,
        generation: Generation,
    },
}

impl ShortenerError {
    /// Ownership races the registry recovers from by re-resolving; everything
    /// else propagates to the caller immediately.
    pub fn is_retryable_ownership(&self) -> bool {
        matches!(
            self,
            ShortenerError::StaleOwner { .. }
                | ShortenerError::LostOwnership
                | ShortenerError::OwnerUnreachable(_)
        )
    }
}
