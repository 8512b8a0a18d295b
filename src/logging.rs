//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout stays clean for command output (`extract`
//! prints JSON lines, `generate` prints spec text). Verbosity follows
//! `RUST_LOG` and defaults to [`DEFAULT_FILTER`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "warn,agent_architect=info";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging() {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
