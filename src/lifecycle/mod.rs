//! # System Lifecycle & Orchestration
//!
//! Wires the pieces into a running system: store, directory, transport,
//! registry, allocator, service. Construction is two-phase — the transport
//! exists before any registry, and registries are registered with it after
//! they are built — so the registry↔transport cycle never needs a
//! half-initialized value.
//!
//! [`ShortenerSystem`] is the single-node shape the binary runs.
//! [`Cluster`] builds several registries over one shared directory, store,
//! and transport; it is how multi-node behavior (forwarding, failover,
//! generation fencing) is exercised without a network.

pub mod tracing;

use crate::allocator::CodeAllocator;
use crate::directory::InMemoryDirectory;
use crate::model::NodeId;
use crate::registry::{ActorRegistry, RegistryConfig};
use crate::service::ShortenerService;
use crate::store::StateStore;
use crate::transport::InProcessTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use self::tracing::setup_tracing;

/// Top-level tuning for a single-node system.
#[derive(Debug, Clone)]
pub struct ShortenerConfig {
    pub idle_window: Duration,
    pub dispatch_retries: u32,
    pub code_length: usize,
    pub allocation_attempts: u32,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            idle_window: Duration::from_secs(120),
            dispatch_retries: 3,
            code_length: crate::allocator::DEFAULT_CODE_LENGTH,
            allocation_attempts: crate::allocator::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A complete single-node system: one registry over the given store, with
/// the allocator and service layered on top.
pub struct ShortenerSystem {
    service: ShortenerService,
    registry: Arc<ActorRegistry>,
    transport: Arc<InProcessTransport>,
    node: NodeId,
}

impl ShortenerSystem {
    pub fn new(store: Arc<dyn StateStore>, config: ShortenerConfig) -> Self {
        let node = NodeId(1);
        let directory = Arc::new(InMemoryDirectory::new());
        let transport = Arc::new(InProcessTransport::new());

        let registry = Arc::new(ActorRegistry::new(
            node,
            RegistryConfig {
                idle_window: config.idle_window,
                dispatch_retries: config.dispatch_retries,
            },
            store,
            directory,
            Arc::clone(&transport) as Arc<dyn crate::transport::NodeTransport>,
        ));
        transport.register(node, Arc::clone(&registry));

        let allocator = CodeAllocator::new(Arc::clone(&registry))
            .with_code_length(config.code_length)
            .with_max_attempts(config.allocation_attempts);
        let service = ShortenerService::new(Arc::clone(&registry), allocator);

        Self {
            service,
            registry,
            transport,
            node,
        }
    }

    pub fn service(&self) -> &ShortenerService {
        &self.service
    }

    pub fn registry(&self) -> &Arc<ActorRegistry> {
        &self.registry
    }

    /// Graceful shutdown: unplug the node and drain every live instance.
    pub async fn shutdown(self) {
        self.transport.deregister(self.node);
        self.registry.shutdown().await;
    }
}

/// Several registry nodes over one shared directory, store, and transport.
pub struct Cluster {
    directory: Arc<InMemoryDirectory>,
    store: Arc<dyn StateStore>,
    transport: Arc<InProcessTransport>,
    nodes: Mutex<HashMap<NodeId, Arc<ActorRegistry>>>,
}

impl Cluster {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            directory: Arc::new(InMemoryDirectory::new()),
            store,
            transport: Arc::new(InProcessTransport::new()),
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a node and makes it reachable to its peers.
    pub fn add_node(&self, node: NodeId, config: RegistryConfig) -> Arc<ActorRegistry> {
        let registry = Arc::new(ActorRegistry::new(
            node,
            config,
            Arc::clone(&self.store),
            Arc::clone(&self.directory) as Arc<dyn crate::directory::NodeDirectory>,
            Arc::clone(&self.transport) as Arc<dyn crate::transport::NodeTransport>,
        ));
        self.transport.register(node, Arc::clone(&registry));
        let mut nodes = self.nodes.lock().expect("cluster lock poisoned");
        nodes.insert(node, Arc::clone(&registry));
        registry
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    /// Kills a node the hard way: unreachable to peers, instance tasks
    /// aborted, ownership *not* released. Callers recover via retry and
    /// directory reclaim, exactly as they would after a real process death.
    pub fn crash_node(&self, node: NodeId) {
        self.transport.deregister(node);
        let registry = {
            let mut nodes = self.nodes.lock().expect("cluster lock poisoned");
            nodes.remove(&node)
        };
        if let Some(registry) = registry {
            registry.crash();
        }
    }

    pub async fn shutdown(self) {
        let nodes: Vec<_> = {
            let mut nodes = self.nodes.lock().expect("cluster lock poisoned");
            nodes.drain().collect()
        };
        for (node, registry) in nodes {
            self.transport.deregister(node);
            registry.shutdown().await;
        }
    }
}
