//! Logging configuration for binaries and examples using this crate.
//!
//! The library itself only emits `tracing` events; callers that want them
//! printed can install this subscriber or bring their own.

use tracing::Level;

/// Initialize the tracing subscriber with the standard configuration.
///
/// Default log level: INFO (overrideable via the `RUST_LOG` environment
/// variable).
///
/// # Example
/// ```no_run
/// sparse_ba::init_logger();
/// tracing::info!("solver ready");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level.
///
/// # Example
/// ```no_run
/// use tracing::Level;
///
/// sparse_ba::init_logger_with_level(Level::DEBUG);
/// tracing::debug!("debug logging enabled");
/// ```
pub fn init_logger_with_level(default_level: Level) {
    use tracing_subscriber::fmt::time::SystemTime;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_timer(SystemTime)
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();
}
