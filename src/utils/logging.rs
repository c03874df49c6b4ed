//! Logging initialization
//!
//! One `tracing-subscriber` setup shared by the CLI and embedding hosts:
//! - `RUST_LOG` always takes precedence
//! - otherwise the filter from config, otherwise `info`
//! - ANSI colors unless `NO_COLOR` is set
//! - JSON lines behind the `json-logging` feature
//!
//! Initialization is attempted once; later calls (or a subscriber installed
//! by the host) leave the existing one in place.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info";

/// Filter from `RUST_LOG`, else `filter`, else "info"
fn build_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(filter.unwrap_or(DEFAULT_FILTER)).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {:?} ({}), using '{}'", filter, e, DEFAULT_FILTER);
        EnvFilter::new(DEFAULT_FILTER)
    })
}

/// Initialize human-readable logging to stderr
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(build_filter(filter))
        .try_init()
        .is_ok()
}

/// Initialize logging with JSON output (for log aggregation)
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) -> bool {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(build_filter(filter))
        .try_init()
        .is_ok()
}

/// Initialize logging from the `[logging]` config section
pub fn init_logging_from_config(config: Option<&LoggingConfig>) -> bool {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map_or(false, |c| c.json_format) {
        #[cfg(feature = "json-logging")]
        {
            return init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            tracing::warn!("json_format requested but the json-logging feature is disabled");
        }
    }
    init_logging(filter)
}
