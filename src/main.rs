//! Single-node server binary.
//!
//! Environment:
//! - `LISTEN_ADDR` — socket address to bind (default `127.0.0.1:8080`).
//! - `STORE_DIR` — directory for the file-backed store; unset means the
//!   in-memory store (state lost on exit).
//! - `RUST_LOG` — log filter, e.g. `shortener=debug`.

use shortener::lifecycle::{setup_tracing, ShortenerConfig, ShortenerSystem};
use shortener::store::{JsonFileStore, MemoryStore, StateStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let addr: SocketAddr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let store: Arc<dyn StateStore> = match std::env::var("STORE_DIR") {
        Ok(dir) => {
            info!(%dir, "using file-backed store");
            Arc::new(JsonFileStore::open(dir)?)
        }
        Err(_) => {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let system = ShortenerSystem::new(store, ShortenerConfig::default());
    let service = system.service().clone();

    tokio::select! {
        result = shortener::http::serve(addr, service) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    system.shutdown().await;
    Ok(())
}
