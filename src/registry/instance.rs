//! # Actor Instance
//!
//! The live, single-threaded execution context bound to one short code. The
//! instance owns the in-memory [`UrlRecord`] exclusively and processes its
//! mailbox in strict FIFO order: no operation begins until the previous one
//! has fully completed, including its persistence await. That serialization
//! is what gives every key linearizable single-writer semantics without any
//! caller-visible locking.

use crate::directory::NodeDirectory;
use crate::error::{DirectoryError, ShortenerError};
use crate::model::{Generation, Lifecycle, NodeId, ShortCode, UrlRecord};
use crate::registry::message::{Envelope, UrlCall, UrlReply};
use crate::registry::InstanceTable;
use crate::store::StateStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

pub(crate) struct UrlActor {
    key: ShortCode,
    node: NodeId,
    receiver: mpsc::UnboundedReceiver<Envelope>,
    store: Arc<dyn StateStore>,
    directory: Arc<dyn NodeDirectory>,
    table: Arc<InstanceTable>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    idle_window: Duration,
    generation: Generation,
    state: Option<UrlRecord>,
}

impl UrlActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key: ShortCode,
        node: NodeId,
        receiver: mpsc::UnboundedReceiver<Envelope>,
        store: Arc<dyn StateStore>,
        directory: Arc<dyn NodeDirectory>,
        table: Arc<InstanceTable>,
        lifecycle: Arc<Mutex<Lifecycle>>,
        idle_window: Duration,
    ) -> Self {
        Self {
            key,
            node,
            receiver,
            store,
            directory,
            table,
            lifecycle,
            idle_window,
            generation: Generation::default(),
            state: None,
        }
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        let mut slot = self.lifecycle.lock().expect("lifecycle mutex poisoned");
        debug!(key = %self.key, from = %*slot, to = %next, "lifecycle transition");
        *slot = next;
    }

    /// Runs the activation protocol and then the mailbox loop to completion.
    pub(crate) async fn run(mut self) {
        // Activating: claim ownership, then load durable state. Messages
        // queue in the mailbox while this is in flight; only the first
        // caller pays for the load.
        match self.directory.claim_ownership(&self.key, self.node).await {
            Ok(generation) => self.generation = generation,
            Err(DirectoryError::AlreadyOwned { owner, generation }) => {
                warn!(key = %self.key, %owner, %generation, "activation lost ownership race");
                self.abort_activation(|| ShortenerError::LostOwnership);
                return;
            }
        }

        match self.store.get(&self.key).await {
            Ok(state) => self.state = state,
            Err(e) => {
                warn!(key = %self.key, error = %e, "state load failed, aborting activation");
                let reason = e.to_string();
                self.abort_activation(|| {
                    ShortenerError::PersistenceFailure(crate::error::StoreError::Unavailable(
                        reason.clone(),
                    ))
                });
                self.directory
                    .release_ownership(&self.key, self.node, self.generation)
                    .await;
                return;
            }
        }

        self.set_lifecycle(Lifecycle::Active);
        info!(key = %self.key, node = %self.node, generation = %self.generation,
              loaded = self.state.is_some(), "instance activated");

        loop {
            match timeout(self.idle_window, self.receiver.recv()).await {
                Ok(Some(envelope)) => self.handle(envelope).await,
                Ok(None) => {
                    // All senders gone: the registry dropped our table entry
                    // during shutdown. Clean release.
                    self.directory
                        .release_ownership(&self.key, self.node, self.generation)
                        .await;
                    self.set_lifecycle(Lifecycle::Inactive);
                    debug!(key = %self.key, "instance shut down");
                    return;
                }
                Err(_idle) => {
                    if self.try_deactivate().await {
                        return;
                    }
                }
            }
        }
    }

    /// Idle eviction with the abort-on-race rule: the emptiness re-check
    /// happens under the table lock, and every enqueue also goes through that
    /// lock, so a message either lands before the check (eviction aborts,
    /// back to `Active`, in-memory state untouched) or after the entry is
    /// removed (a fresh activation will serve it).
    async fn try_deactivate(&mut self) -> bool {
        self.set_lifecycle(Lifecycle::Deactivating);

        let removed = {
            let mut table = self.table.lock().expect("registry table poisoned");
            if self.receiver.is_empty() {
                table.remove(&self.key);
                true
            } else {
                false
            }
        };

        if !removed {
            self.set_lifecycle(Lifecycle::Active);
            debug!(key = %self.key, "eviction aborted by in-flight message");
            return false;
        }

        self.directory
            .release_ownership(&self.key, self.node, self.generation)
            .await;
        self.set_lifecycle(Lifecycle::Inactive);
        info!(key = %self.key, node = %self.node, "instance deactivated after idle window");
        true
    }

    /// Fails every queued operation and removes this instance's table entry.
    fn abort_activation(&mut self, error: impl Fn() -> ShortenerError) {
        {
            let mut table = self.table.lock().expect("registry table poisoned");
            if let Some(entry) = table.get(&self.key) {
                if Arc::ptr_eq(&entry.lifecycle, &self.lifecycle) {
                    table.remove(&self.key);
                }
            }
        }
        self.set_lifecycle(Lifecycle::Inactive);
        self.receiver.close();
        while let Ok(envelope) = self.receiver.try_recv() {
            let _ = envelope.respond_to.send(Err(error()));
        }
    }

    async fn handle(&mut self, envelope: Envelope) {
        if let Some(expected) = envelope.expected_generation {
            if expected != self.generation {
                debug!(key = %self.key, %expected, actual = %self.generation,
                       "rejecting stale-generation call");
                let _ = envelope.respond_to.send(Err(ShortenerError::StaleOwner {
                    expected,
                    actual: self.generation,
                }));
                return;
            }
        }

        let result = match envelope.call {
            UrlCall::GetUrl => self.get_url(),
            UrlCall::SetUrl { full_url } => self.set_url(full_url).await.map(|_| UrlReply::Set),
            UrlCall::SetUrlIfAbsent { full_url } => {
                if self.state.is_some() {
                    Ok(UrlReply::Claimed(false))
                } else {
                    self.set_url(full_url).await.map(|_| UrlReply::Claimed(true))
                }
            }
        };

        if let Err(e) = &result {
            debug!(key = %self.key, error = %e, "operation failed");
        }
        let _ = envelope.respond_to.send(result);
    }

    fn get_url(&self) -> Result<UrlReply, ShortenerError> {
        match &self.state {
            Some(record) => Ok(UrlReply::Url(record.full_url.clone())),
            None => Err(ShortenerError::NotFound(self.key.clone())),
        }
    }

    /// Write-through mutation: the in-memory slot is updated first, then
    /// persisted. Success is acknowledged only after the store confirms; on a
    /// store failure the slot is rolled back so no subsequent read on this
    /// instance ever observes the unpersisted value.
    async fn set_url(&mut self, full_url: String) -> Result<(), ShortenerError> {
        if Url::parse(&full_url).is_err() {
            return Err(ShortenerError::InvalidUrl(full_url));
        }

        let record = UrlRecord {
            short_code: self.key.clone(),
            full_url,
        };
        let previous = self.state.replace(record.clone());

        match self.store.put(&self.key, &record).await {
            Ok(()) => {
                debug!(key = %self.key, "record written through");
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "write-through failed, rolling back");
                self.state = previous;
                Err(e.into())
            }
        }
    }
}
