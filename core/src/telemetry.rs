// Logging setup
use tracing_subscriber::EnvFilter;

/// Install a compact fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns false when a global subscriber is already set, so tests and
/// binaries can both call it.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
