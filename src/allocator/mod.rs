//! # Code Allocator
//!
//! Produces short codes that are unique across the whole system, even under
//! concurrent allocation from multiple nodes. Candidates come from a thread
//! RNG rather than a counter, so codes are not enumerable; uniqueness is then
//! *verified*, not assumed: the allocator claims the candidate with the
//! registry's create-if-absent operation, which runs inside the candidate
//! instance's serialized mailbox. A collision (another allocation won the
//! same candidate first) just costs a retry with fresh entropy.

use crate::error::ShortenerError;
use crate::model::ShortCode;
use crate::registry::ActorRegistry;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_CODE_LENGTH: usize = 8;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct CodeAllocator {
    registry: Arc<ActorRegistry>,
    code_length: usize,
    max_attempts: u32,
}

impl CodeAllocator {
    pub fn new(registry: Arc<ActorRegistry>) -> Self {
        Self {
            registry,
            code_length: DEFAULT_CODE_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Allocates a fresh code and records `full_url` under it.
    ///
    /// At 8 alphanumeric characters a collision needs two allocations to draw
    /// the same one of 62^8 candidates, so exhausting the retry bound is a
    /// sign of something much worse than bad luck.
    pub async fn allocate(&self, full_url: &str) -> Result<ShortCode, ShortenerError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.random_candidate();
            if self
                .registry
                .set_url_if_absent(&candidate, full_url.to_string())
                .await?
            {
                info!(code = %candidate, attempt, "code allocated");
                return Ok(candidate);
            }
            debug!(code = %candidate, attempt, "candidate taken, retrying");
        }
        Err(ShortenerError::AllocationExhausted {
            attempts: self.max_attempts,
        })
    }

    fn random_candidate(&self) -> ShortCode {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.code_length)
            .map(char::from)
            .collect();
        ShortCode::new(code)
    }
}
