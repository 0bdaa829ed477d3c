//! Logging configuration for the gateway.
//!
//! Logs go to stderr so that a host speaking a line protocol on stdout is
//! never corrupted by diagnostics.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging with an env-filter.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
