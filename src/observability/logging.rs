//! Structured logging setup.

use tracing_subscriber::EnvFilter;

use crate::config::MemoryGraphConfig;

/// Initializes the global tracing subscriber.
///
/// The level comes from `MEMORY_LOG_LEVEL` via the config; `RUST_LOG`
/// overrides it when set. Logs go to stderr so stdout stays clean for the
/// MCP stdio transport. `json = true` switches to line-delimited JSON for
/// log shippers. Calling this twice is a no-op.
pub fn init_logging(config: &MemoryGraphConfig, json: bool) {
    let default_filter = format!("memorygraph={}", config.log_level.to_lowercase());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
