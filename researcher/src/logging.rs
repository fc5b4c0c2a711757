//! Diagnostic tracing for the CLI and the server.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. Stage progress and
//! the final report are product output and are printed regardless of the
//! filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// CLI default: fallback plans and tool failures stay visible.
pub const CLI_FILTER: &str = "warn";

/// Server default: request and mission lifecycle at info.
pub const SERVER_FILTER: &str = "warn,researcher=info,researcher_server=info";

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Output: stderr, compact
/// format.
///
/// # Example
/// ```bash
/// RUST_LOG=researcher=debug researcher run "state of solid-state batteries"
/// ```
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
