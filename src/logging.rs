//! Logging and tracing setup.
//!
//! Structured logging via the tracing crate. Output goes to stderr so
//! stdout stays machine-readable for the CLI. Initialization is idempotent
//! and filter configuration comes from `RUST_LOG` with a caller-supplied
//! fallback.

use std::sync::Once;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber with human-readable output.
///
/// `default_filter` applies when `RUST_LOG` is unset. Subsequent calls are
/// ignored.
pub fn init_tracing(default_filter: &str) {
    let default_filter = default_filter.to_string();
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    });
}

/// Initialize the global tracing subscriber with JSON output, for embedding
/// in services that collect structured logs.
pub fn init_tracing_json(default_filter: &str) {
    let default_filter = default_filter.to_string();
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_current_span(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    });
}
