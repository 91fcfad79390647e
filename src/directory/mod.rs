//! # Node Directory
//!
//! Maps a key to the node currently (or newly) responsible for activating it.
//! The directory is the sole source of the cross-node exclusivity guarantee:
//! its ownership-grant operation is linearizable per key, and every ownership
//! change bumps the key's generation so stale holders can be rejected.
//!
//! [`InMemoryDirectory`] is the provided single-authority implementation. A
//! consensus-backed directory would implement the same trait; its internal
//! concurrency control is opaque to the registry.

use crate::error::DirectoryError;
use crate::model::{Generation, NodeId, ShortCode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Ownership authority consumed by the registry.
#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Who owns `key` right now, if anyone.
    async fn resolve_owner(&self, key: &ShortCode) -> Option<(NodeId, Generation)>;

    /// Claim ownership of `key` for `node`.
    ///
    /// Granting is serialized per key: under a race exactly one claimant wins
    /// and the rest get [`DirectoryError::AlreadyOwned`]. Every grant bumps
    /// the generation — including a re-claim by a node the directory already
    /// names as owner (the crash-restart case), so any earlier instance on
    /// that node is fenced out.
    async fn claim_ownership(
        &self,
        key: &ShortCode,
        node: NodeId,
    ) -> Result<Generation, DirectoryError>;

    /// Release ownership after a clean deactivation. The release is fenced:
    /// it only takes effect while `node` still owns `key` at exactly
    /// `generation`, so a late release from a superseded instance is a
    /// no-op. The generation counter itself is preserved so it stays
    /// monotonic across the key's lifetime.
    async fn release_ownership(&self, key: &ShortCode, node: NodeId, generation: Generation);

    /// Forcibly reassign `key` to `node` after its owner was reported
    /// unreachable. Always bumps the generation, so any lingering instance on
    /// the old owner serves only stale-generation calls from then on.
    async fn reclaim_ownership(&self, key: &ShortCode, node: NodeId) -> Generation;
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    owner: Option<NodeId>,
    generation: Generation,
}

/// Single-authority directory backed by a per-process map.
///
/// The mutex makes every grant linearizable per key (and, trivially, across
/// keys). Suitable for one process or a test cluster sharing the `Arc`.
#[derive(Default)]
pub struct InMemoryDirectory {
    placements: Mutex<HashMap<ShortCode, Placement>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeDirectory for InMemoryDirectory {
    async fn resolve_owner(&self, key: &ShortCode) -> Option<(NodeId, Generation)> {
        let placements = self.placements.lock().expect("directory mutex poisoned");
        placements
            .get(key)
            .and_then(|p| p.owner.map(|node| (node, p.generation)))
    }

    async fn claim_ownership(
        &self,
        key: &ShortCode,
        node: NodeId,
    ) -> Result<Generation, DirectoryError> {
        let mut placements = self.placements.lock().expect("directory mutex poisoned");
        let placement = placements.entry(key.clone()).or_insert(Placement {
            owner: None,
            generation: Generation::default(),
        });
        match placement.owner {
            Some(owner) if owner != node => Err(DirectoryError::AlreadyOwned {
                owner,
                generation: placement.generation,
            }),
            _ => {
                placement.generation = placement.generation.next();
                placement.owner = Some(node);
                debug!(%key, %node, generation = %placement.generation, "ownership granted");
                Ok(placement.generation)
            }
        }
    }

    async fn release_ownership(&self, key: &ShortCode, node: NodeId, generation: Generation) {
        let mut placements = self.placements.lock().expect("directory mutex poisoned");
        if let Some(placement) = placements.get_mut(key) {
            if placement.owner == Some(node) && placement.generation == generation {
                placement.owner = None;
                debug!(%key, %node, %generation, "ownership released");
            }
        }
    }

    async fn reclaim_ownership(&self, key: &ShortCode, node: NodeId) -> Generation {
        let mut placements = self.placements.lock().expect("directory mutex poisoned");
        let placement = placements.entry(key.clone()).or_insert(Placement {
            owner: None,
            generation: Generation::default(),
        });
        placement.generation = placement.generation.next();
        let previous = placement.owner.replace(node);
        info!(%key, %node, ?previous, generation = %placement.generation, "ownership reclaimed");
        placement.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claim_is_exclusive_and_every_grant_bumps() {
        let dir = InMemoryDirectory::new();
        let key = ShortCode::from("k1");

        let g1 = dir.claim_ownership(&key, NodeId(1)).await.unwrap();
        // Re-claim by the same node (crash-restart) fences the old grant.
        let g2 = dir.claim_ownership(&key, NodeId(1)).await.unwrap();
        assert!(g2 > g1);
        // A different node loses the race.
        let err = dir.claim_ownership(&key, NodeId(2)).await.unwrap_err();
        let DirectoryError::AlreadyOwned { owner, generation } = err;
        assert_eq!(owner, NodeId(1));
        assert_eq!(generation, g2);
    }

    #[tokio::test]
    async fn generation_survives_release() {
        let dir = InMemoryDirectory::new();
        let key = ShortCode::from("k1");

        let g1 = dir.claim_ownership(&key, NodeId(1)).await.unwrap();
        dir.release_ownership(&key, NodeId(1), g1).await;
        assert!(dir.resolve_owner(&key).await.is_none());

        let g2 = dir.claim_ownership(&key, NodeId(2)).await.unwrap();
        assert!(g2 > g1);
    }

    #[tokio::test]
    async fn reclaim_always_bumps() {
        let dir = InMemoryDirectory::new();
        let key = ShortCode::from("k1");

        let g1 = dir.claim_ownership(&key, NodeId(1)).await.unwrap();
        let g2 = dir.reclaim_ownership(&key, NodeId(2)).await;
        assert!(g2 > g1);
        assert_eq!(dir.resolve_owner(&key).await, Some((NodeId(2), g2)));
    }

    #[tokio::test]
    async fn stale_release_is_ignored() {
        let dir = InMemoryDirectory::new();
        let key = ShortCode::from("k1");

        let g1 = dir.claim_ownership(&key, NodeId(1)).await.unwrap();
        // Wrong node.
        dir.release_ownership(&key, NodeId(2), g1).await;
        assert_eq!(dir.resolve_owner(&key).await, Some((NodeId(1), g1)));
        // Right node, superseded generation.
        let g2 = dir.claim_ownership(&key, NodeId(1)).await.unwrap();
        dir.release_ownership(&key, NodeId(1), g1).await;
        assert_eq!(dir.resolve_owner(&key).await, Some((NodeId(1), g2)));
    }
}
