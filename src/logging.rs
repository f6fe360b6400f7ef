//! Logging setup for the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Setup logging to stderr.
///
/// Only this crate logs, at `warn` by default or `debug` with `--debug`.
/// `NEXUS_LOG` overrides the level; with `NEXUS_LOG_ALL` set, the level
/// applies to every crate (reqwest, hyper, ...).
pub fn setup_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let log_level = std::env::var("NEXUS_LOG").unwrap_or_else(|_| default_level.to_string());

    let filter = if std::env::var("NEXUS_LOG_ALL").is_ok() {
        log_level
    } else {
        format!("nexus_deployments={}", log_level)
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::new(filter))
        .init();
}
