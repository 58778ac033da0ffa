//! Process-wide log output for the `badgerelay` binary.
//!
//! The library never installs a subscriber; attempt records reach it through
//! [`crate::audit::TracingLog`] once `main` has called [`init_tracing`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber, writing to stderr so stdout stays free.
///
/// `RUST_LOG` replaces `default_filter` when set. With `log_json` every
/// attempt record becomes one JSON line whose `fields` object carries
/// `windowID`, `label`, `color` and `result`.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
