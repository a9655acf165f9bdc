//! Tracing/logging initialization.
//!
//! JSON logs by default (the enforcement gateway's denial events are meant
//! to be machine-collected); set `WARDEN_LOG_FORMAT=pretty` for local work.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let pretty = std::env::var("WARDEN_LOG_FORMAT").is_ok_and(|v| v == "pretty");
    if pretty {
        let _ = builder.try_init();
    } else {
        let _ = builder.json().try_init();
    }
}
