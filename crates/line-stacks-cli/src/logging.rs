use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging to stderr, keeping stdout free for the GeoJSON output.
///
/// If RUST_LOG is not set, debug builds default to DEBUG for this workspace and release
/// builds to INFO.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "info,line_stacks=debug,line_stacks_cli=debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    #[cfg(feature = "profiling")]
    tracing::info!("Logging initialized with profiling scopes reported as tracing spans");
    #[cfg(not(feature = "profiling"))]
    tracing::debug!("Logging initialized");
}
