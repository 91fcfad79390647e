//! # Node Transport
//!
//! Delivers forwarded calls to the node the directory names as owner. The
//! registry only sees the trait; [`InProcessTransport`] is the in-process
//! implementation used by the single-node binary and the test cluster, where
//! "nodes" are peer registries in the same process. Peers are registered
//! after construction — the same late-binding move the rest of the crate uses
//! to break construction cycles.

use crate::error::ShortenerError;
use crate::model::{Generation, NodeId, ShortCode};
use crate::registry::message::{UrlCall, UrlReply};
use crate::registry::ActorRegistry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Carries a call to a remote owner and returns its reply.
///
/// `OwnerUnreachable` is the transport's own failure mode; everything else in
/// the result comes from the remote instance.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    async fn forward(
        &self,
        node: NodeId,
        key: &ShortCode,
        generation: Generation,
        call: UrlCall,
    ) -> Result<UrlReply, ShortenerError>;
}

/// Routes forwarded calls directly to peer registries in this process.
#[derive(Default)]
pub struct InProcessTransport {
    peers: RwLock<HashMap<NodeId, Arc<ActorRegistry>>>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `registry` reachable as `node`.
    pub fn register(&self, node: NodeId, registry: Arc<ActorRegistry>) {
        let mut peers = self.peers.write().expect("transport lock poisoned");
        peers.insert(node, registry);
    }

    /// Removes `node` from the reachable set; forwarded calls to it fail with
    /// `OwnerUnreachable` from then on. Used to simulate node death.
    pub fn deregister(&self, node: NodeId) -> Option<Arc<ActorRegistry>> {
        let mut peers = self.peers.write().expect("transport lock poisoned");
        peers.remove(&node)
    }
}

#[async_trait]
impl NodeTransport for InProcessTransport {
    async fn forward(
        &self,
        node: NodeId,
        key: &ShortCode,
        generation: Generation,
        call: UrlCall,
    ) -> Result<UrlReply, ShortenerError> {
        let peer = {
            let peers = self.peers.read().expect("transport lock poisoned");
            peers.get(&node).cloned()
        };
        match peer {
            Some(registry) => {
                debug!(%key, %node, %generation, "delivering forwarded call");
                registry.handle_remote(key, generation, call).await
            }
            None => Err(ShortenerError::OwnerUnreachable(node)),
        }
    }
}
