//! # Redirect/Shorten Service
//!
//! The request-level API the HTTP boundary consumes. No state of its own:
//! `shorten` validates and delegates to the allocator, `resolve` reads
//! through the registry. Error mapping to status codes happens one layer up.

use crate::allocator::CodeAllocator;
use crate::error::ShortenerError;
use crate::model::ShortCode;
use crate::registry::ActorRegistry;
use std::sync::Arc;
use tracing::instrument;
use url::Url;

#[derive(Clone)]
pub struct ShortenerService {
    registry: Arc<ActorRegistry>,
    allocator: CodeAllocator,
}

impl ShortenerService {
    pub fn new(registry: Arc<ActorRegistry>, allocator: CodeAllocator) -> Self {
        Self {
            registry,
            allocator,
        }
    }

    /// Validates `full_url` and allocates a code for it.
    ///
    /// Validation happens before any allocation so a malformed URL never
    /// claims a code.
    #[instrument(skip(self))]
    pub async fn shorten(&self, full_url: &str) -> Result<ShortCode, ShortenerError> {
        if Url::parse(full_url).is_err() {
            return Err(ShortenerError::InvalidUrl(full_url.to_string()));
        }
        self.allocator.allocate(full_url).await
    }

    /// Returns the URL recorded for `code`, or `NotFound`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, code: &ShortCode) -> Result<String, ShortenerError> {
        self.registry.get_url(code).await
    }
}
