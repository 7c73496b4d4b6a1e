//! Tracing subscriber setup.
//!
//! Environment:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `RUST_LOG` | standard env filter (default `noteless=info,tower_http=info`) |
//! | `LOG_FORMAT` | `text` (default) or `json` |
//! | `LOG_ANSI` | `true`/`false` to force ANSI colors on text output |
//!
//! Logs go to stderr so CLI output on stdout stays machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "noteless=info,tower_http=info";

/// Install the global subscriber. Safe to call once per process; later
/// calls are ignored.
pub fn init() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        if let Some(ansi) = log_ansi {
            layer = layer.with_ansi(ansi);
        }
        registry.with(layer).try_init()
    };

    if result.is_ok() {
        tracing::debug!(log_format = %log_format, "Logging initialized");
    }
}
