//! Component K: logging setup.
//!
//! A single `tracing-subscriber` initialisation shared by the binary
//! and, optionally, by embedders that want the same formatting. Spans
//! opened inside [`crate::traversal`] (one per pass, one per depth
//! level) are rendered by whatever subscriber is installed here; this
//! module only owns picking the filter and the writer.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` always wins if set. Otherwise falls back to `info` (or
/// `debug` with `verbose`), scoped to this crate and its binary so that
/// a dependency's own chatter doesn't drown out the fill log.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("taxafill={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
