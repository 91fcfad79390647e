//! # Shortener
//!
//! A URL shortener whose distributed behavior is made well-defined by a
//! **key-addressed single-writer actor registry** with durable state: all
//! reads and writes for a given short code are serialized through exactly one
//! live handler, no matter how many server processes are running.
//!
//! ## 🗺️ Module Tour
//!
//! ### The Engine ([`registry`])
//! The per-node [`ActorRegistry`](registry::ActorRegistry) and the per-key
//! actor instance. Dispatch is a two-level lookup (local table, then node
//! directory); activation, idle eviction, and generation fencing live here.
//!
//! ### The Collaborators ([`store`], [`directory`], [`transport`])
//! Trait seams for the durable key→blob store, the ownership authority, and
//! the path to remote owners. In-memory and file-backed implementations ship
//! with the crate; a real deployment would swap in networked ones behind the
//! same traits.
//!
//! ### The Domain ([`allocator`], [`service`], [`http`])
//! Random-candidate code allocation verified by create-if-absent, the
//! shorten/resolve service, and the thin axum boundary.
//!
//! ### The Orchestrator ([`lifecycle`])
//! [`ShortenerSystem`](lifecycle::ShortenerSystem) wires a single node;
//! [`Cluster`](lifecycle::Cluster) wires several over shared collaborators
//! for multi-node scenarios.
//!
//! ## Concurrency Model
//!
//! Each live instance runs in its own tokio task and processes its mailbox
//! strictly in order — an operation's persistence await completes before the
//! next operation starts. Operations on different keys run fully in
//! parallel. No instance state is reachable from outside its task.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shortener::lifecycle::{ShortenerConfig, ShortenerSystem};
//! use shortener::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), shortener::error::ShortenerError> {
//! let system = ShortenerSystem::new(Arc::new(MemoryStore::new()), ShortenerConfig::default());
//! let code = system.service().shorten("https://example.com/a").await?;
//! assert_eq!(
//!     system.service().resolve(&code).await?,
//!     "https://example.com/a"
//! );
//! system.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod directory;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod registry;
pub mod service;
pub mod store;
pub mod transport;

pub use error::ShortenerError;
pub use model::{Generation, Lifecycle, NodeId, ShortCode, UrlRecord};
