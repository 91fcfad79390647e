//! # Registry Messages
//!
//! Wire-shaped operation and reply enums plus the mailbox envelope. `UrlCall`
//! and `UrlReply` are plain data (serde-derived) so a forwarded call has a
//! well-defined shape independent of the in-process transport used here; the
//! reply channel lives only in the local [`Envelope`].

use crate::error::ShortenerError;
use crate::model::Generation;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// One-shot reply channel carried by every enqueued operation.
pub type Response = oneshot::Sender<Result<UrlReply, ShortenerError>>;

/// An operation addressed to one short code's instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlCall {
    /// Record `full_url` for this code, overwriting any prior value.
    SetUrl { full_url: String },
    /// Record `full_url` only if no record exists yet. This is the
    /// allocator's compare-and-set; it runs atomically inside the instance's
    /// serialized mailbox.
    SetUrlIfAbsent { full_url: String },
    /// Read the recorded URL.
    GetUrl,
}

/// Successful outcome of a [`UrlCall`], variant-paired with the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlReply {
    /// `SetUrl` persisted.
    Set,
    /// `SetUrlIfAbsent`: `true` when this call created the record.
    Claimed(bool),
    /// `GetUrl` result.
    Url(String),
}

/// Mailbox entry: the call, the generation the sender expects the owner to
/// hold (`None` for local callers, who trust the local table), and the reply
/// channel.
#[derive(Debug)]
pub struct Envelope {
    pub expected_generation: Option<Generation>,
    pub call: UrlCall,
    pub respond_to: Response,
}
