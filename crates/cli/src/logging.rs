//! Process-wide tracing setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean for command output (including
//! `--json`). The filter comes from `RUST_LOG`, defaulting to `info`.

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize tracing with human-readable output. Later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

        let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
        debug!("tracing initialized");
    });
}

/// Initialize tracing with one JSON object per event.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true);

        let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
        debug!("tracing initialized (JSON mode)");
    });
}

pub fn init(json: bool) {
    if json {
        init_tracing_json();
    } else {
        init_tracing();
    }
}
