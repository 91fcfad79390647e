/// Initializes structured logging for the process.
///
/// Uses the `tracing` subscriber with environment-based filtering: set
/// `RUST_LOG` (e.g. `RUST_LOG=shortener=debug`) to control verbosity.
/// Call once, before anything else logs.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
