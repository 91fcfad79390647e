//! # Actor Registry
//!
//! The per-node component that owns the mapping from [`ShortCode`] to at most
//! one live actor instance and routes every operation to the right place.
//! Dispatch is a two-level lookup: the local instance table first, then the
//! [`NodeDirectory`]. A remote owner gets the call forwarded with the
//! generation the directory reported; a local miss activates a fresh instance
//! whose first act is to claim ownership.
//!
//! ## Exactly-one-active
//!
//! The table mutex is the local half of the invariant: inserting the mailbox
//! sender and spawning the instance happen atomically under it, so only the
//! first caller activates and everyone else queues behind the state load.
//! Mailboxes are unbounded precisely so that enqueue is synchronous and can
//! run under that lock — the lock is never held across an await. The
//! cross-node half is the directory's serialized grant plus the generation
//! check on forwarded calls.

pub mod message;

mod instance;

use crate::directory::NodeDirectory;
use crate::error::ShortenerError;
use crate::model::{Generation, Lifecycle, NodeId, ShortCode};
use crate::store::StateStore;
use crate::transport::NodeTransport;
use instance::UrlActor;
use message::{Envelope, UrlCall, UrlReply};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tuning knobs for one registry node.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long an instance may sit with an empty mailbox before it is
    /// deactivated and its ownership released.
    pub idle_window: Duration,
    /// How many times `call` re-resolves and retries after an ownership race
    /// before surfacing the error.
    pub dispatch_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_window: Duration::from_secs(120),
            dispatch_retries: 3,
        }
    }
}

pub(crate) struct InstanceEntry {
    sender: mpsc::UnboundedSender<Envelope>,
    pub(crate) lifecycle: Arc<Mutex<Lifecycle>>,
    task: JoinHandle<()>,
}

/// Local table of live instances, shared between the registry and the
/// instances themselves (eviction removes the entry from inside the task).
pub(crate) type InstanceTable = Mutex<HashMap<ShortCode, InstanceEntry>>;

/// Where a call for a key should go, decided from the local node id and the
/// directory's answer. Pure so it can be tested without any I/O or transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Another node owns the key; forward, carrying the expected generation.
    Forward {
        node: NodeId,
        generation: Generation,
    },
    /// This node owns the key (or nobody does): activate locally.
    ActivateLocal,
}

/// The routing rule of the two-level lookup's second level.
pub fn route(local: NodeId, resolved: Option<(NodeId, Generation)>) -> RouteDecision {
    match resolved {
        Some((owner, generation)) if owner != local => RouteDecision::Forward {
            node: owner,
            generation,
        },
        _ => RouteDecision::ActivateLocal,
    }
}

/// Per-node actor registry. See the module docs for the dispatch protocol.
pub struct ActorRegistry {
    node: NodeId,
    config: RegistryConfig,
    store: Arc<dyn StateStore>,
    directory: Arc<dyn NodeDirectory>,
    transport: Arc<dyn NodeTransport>,
    table: Arc<InstanceTable>,
}

impl ActorRegistry {
    pub fn new(
        node: NodeId,
        config: RegistryConfig,
        store: Arc<dyn StateStore>,
        directory: Arc<dyn NodeDirectory>,
        transport: Arc<dyn NodeTransport>,
    ) -> Self {
        Self {
            node,
            config,
            store,
            directory,
            transport,
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Dispatches `call` to the instance owning `key`, wherever it lives.
    ///
    /// Ownership races (`StaleOwner`, `LostOwnership`, `OwnerUnreachable`)
    /// are recovered internally: the registry re-resolves and retries up to
    /// the configured bound, reclaiming ownership through the directory when
    /// the reported owner is unreachable. Only exhaustion of that bound
    /// surfaces the race to the caller.
    pub async fn call(&self, key: &ShortCode, call: UrlCall) -> Result<UrlReply, ShortenerError> {
        let mut last_err = ShortenerError::ActorClosed;
        for attempt in 0..=self.config.dispatch_retries {
            match self.try_dispatch(key, call.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable_ownership() => {
                    debug!(%key, attempt, error = %e, "ownership race, re-resolving");
                    if let ShortenerError::OwnerUnreachable(dead) = &e {
                        // The caller's retry is what triggers reactivation:
                        // take the key over at a higher generation.
                        let generation =
                            self.directory.reclaim_ownership(key, self.node).await;
                        info!(%key, %dead, %generation, "reclaimed key from unreachable owner");
                    }
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        warn!(%key, error = %last_err, "dispatch retries exhausted");
        Err(last_err)
    }

    async fn try_dispatch(
        &self,
        key: &ShortCode,
        call: UrlCall,
    ) -> Result<UrlReply, ShortenerError> {
        // Level one: the local table.
        if let Some(rx) = self.enqueue_if_present(key, call.clone(), None) {
            return await_reply(rx).await;
        }

        // Level two: the directory.
        match route(self.node, self.directory.resolve_owner(key).await) {
            RouteDecision::Forward { node, generation } => {
                debug!(%key, owner = %node, %generation, "forwarding to remote owner");
                self.transport.forward(node, key, generation, call).await
            }
            RouteDecision::ActivateLocal => {
                let rx = self.enqueue_or_activate(key, call, None);
                await_reply(rx).await
            }
        }
    }

    /// Entry point for calls forwarded by a peer node. The envelope carries
    /// the generation the sender resolved; the instance rejects it with
    /// `StaleOwner` if ownership has advanced past it.
    pub async fn handle_remote(
        &self,
        key: &ShortCode,
        expected_generation: Generation,
        call: UrlCall,
    ) -> Result<UrlReply, ShortenerError> {
        let rx = match self.enqueue_if_present(key, call.clone(), Some(expected_generation)) {
            Some(rx) => rx,
            // The directory pointed the sender at us; activate to serve it.
            None => self.enqueue_or_activate(key, call, Some(expected_generation)),
        };
        await_reply(rx).await
    }

    /// Enqueues onto an existing instance, or reports that none is live.
    fn enqueue_if_present(
        &self,
        key: &ShortCode,
        call: UrlCall,
        expected_generation: Option<Generation>,
    ) -> Option<oneshot::Receiver<Result<UrlReply, ShortenerError>>> {
        let mut table = self.table.lock().expect("registry table poisoned");
        let entry = table.get(key)?;
        let (respond_to, rx) = oneshot::channel();
        let envelope = Envelope {
            expected_generation,
            call,
            respond_to,
        };
        if entry.sender.send(envelope).is_err() {
            // The instance exited between lookups; clear the dead entry so
            // the caller activates a fresh one.
            table.remove(key);
            return None;
        }
        Some(rx)
    }

    /// Enqueues onto the instance for `key`, activating one if needed. Insert
    /// and spawn happen under the table lock, so concurrent callers for the
    /// same key race to a single activation and queue behind its load.
    fn enqueue_or_activate(
        &self,
        key: &ShortCode,
        call: UrlCall,
        expected_generation: Option<Generation>,
    ) -> oneshot::Receiver<Result<UrlReply, ShortenerError>> {
        let (respond_to, rx) = oneshot::channel();
        let mut envelope = Envelope {
            expected_generation,
            call,
            respond_to,
        };

        let mut table = self.table.lock().expect("registry table poisoned");
        if let Some(entry) = table.get(key) {
            match entry.sender.send(envelope) {
                Ok(()) => return rx,
                Err(failed) => {
                    // Dead entry: reclaim the envelope and replace it below.
                    envelope = failed.0;
                    table.remove(key);
                }
            }
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let lifecycle = Arc::new(Mutex::new(Lifecycle::Activating));
        let actor = UrlActor::new(
            key.clone(),
            self.node,
            receiver,
            Arc::clone(&self.store),
            Arc::clone(&self.directory),
            Arc::clone(&self.table),
            Arc::clone(&lifecycle),
            self.config.idle_window,
        );
        let task = tokio::spawn(actor.run());
        debug!(%key, node = %self.node, "activating instance");

        // Send before unlocking so nothing can observe an empty mailbox
        // between insert and first message.
        let _ = sender.send(envelope);
        table.insert(
            key.clone(),
            InstanceEntry {
                sender,
                lifecycle,
                task,
            },
        );
        rx
    }

    // --- Typed convenience wrappers over `call` ---

    pub async fn set_url(&self, key: &ShortCode, full_url: String) -> Result<(), ShortenerError> {
        match self.call(key, UrlCall::SetUrl { full_url }).await? {
            UrlReply::Set => Ok(()),
            other => unreachable!("SetUrl answered with {other:?}"),
        }
    }

    /// Create-if-absent: `true` when this call recorded the URL, `false`
    /// when the code was already taken.
    pub async fn set_url_if_absent(
        &self,
        key: &ShortCode,
        full_url: String,
    ) -> Result<bool, ShortenerError> {
        match self.call(key, UrlCall::SetUrlIfAbsent { full_url }).await? {
            UrlReply::Claimed(created) => Ok(created),
            other => unreachable!("SetUrlIfAbsent answered with {other:?}"),
        }
    }

    pub async fn get_url(&self, key: &ShortCode) -> Result<String, ShortenerError> {
        match self.call(key, UrlCall::GetUrl).await? {
            UrlReply::Url(url) => Ok(url),
            other => unreachable!("GetUrl answered with {other:?}"),
        }
    }

    /// Observable lifecycle of the local instance for `key`, if any.
    pub fn lifecycle_of(&self, key: &ShortCode) -> Lifecycle {
        let table = self.table.lock().expect("registry table poisoned");
        table
            .get(key)
            .map(|entry| *entry.lifecycle.lock().expect("lifecycle mutex poisoned"))
            .unwrap_or(Lifecycle::Inactive)
    }

    /// Number of live local instances.
    pub fn active_instances(&self) -> usize {
        self.table.lock().expect("registry table poisoned").len()
    }

    /// Graceful shutdown: drop every mailbox sender so each instance drains,
    /// releases its ownership, and exits. Waits for all tasks to finish.
    pub async fn shutdown(&self) {
        let entries: Vec<InstanceEntry> = {
            let mut table = self.table.lock().expect("registry table poisoned");
            table.drain().map(|(_, entry)| entry).collect()
        };
        let count = entries.len();
        for entry in entries {
            drop(entry.sender);
            let _ = entry.task.await;
        }
        info!(node = %self.node, instances = count, "registry shut down");
    }

    /// Simulated crash: abort every instance task without releasing
    /// ownership or flushing anything. In-flight operations are lost; the
    /// directory still names this node as owner until a caller's retry
    /// reclaims each key at a higher generation.
    pub fn crash(&self) {
        let mut table = self.table.lock().expect("registry table poisoned");
        let count = table.len();
        for (_, entry) in table.drain() {
            entry.task.abort();
        }
        warn!(node = %self.node, instances = count, "registry crashed");
    }
}

async fn await_reply(
    rx: oneshot::Receiver<Result<UrlReply, ShortenerError>>,
) -> Result<UrlReply, ShortenerError> {
    rx.await.map_err(|_| ShortenerError::ActorDropped)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_prefers_local_when_unowned() {
        assert_eq!(route(NodeId(1), None), RouteDecision::ActivateLocal);
    }

    #[test]
    fn route_prefers_local_when_self_owns() {
        let resolved = Some((NodeId(1), Generation(4)));
        assert_eq!(route(NodeId(1), resolved), RouteDecision::ActivateLocal);
    }

    #[test]
    fn route_forwards_to_remote_owner() {
        let resolved = Some((NodeId(2), Generation(4)));
        assert_eq!(
            route(NodeId(1), resolved),
            RouteDecision::Forward {
                node: NodeId(2),
                generation: Generation(4)
            }
        );
    }
}
