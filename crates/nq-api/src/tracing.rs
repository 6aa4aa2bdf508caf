//! Log output for the review server.
//!
//! Development gets pretty, colored output with source locations; production
//! gets one flattened JSON object per event for the log pipeline. `RUST_LOG`
//! overrides the default filter in both cases.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

/// Default directives when `RUST_LOG` is unset
pub fn default_filter(env: &Environment) -> &'static str {
    if env.is_development() {
        "debug,tower_http=debug,sqlx=warn"
    } else {
        "info,tower_http=info,sqlx=warn"
    }
}

/// Install the global subscriber. Call once, before the server starts.
pub fn init_tracing(env: &Environment) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(env)));

    let registry = tracing_subscriber::registry();
    if env.is_development() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .pretty()
                    .with_filter(env_filter),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_target(true)
                    .with_filter(env_filter),
            )
            .init();
    }

    tracing::info!(environment = ?env, "Tracing initialized");
}
