//! Logging initialization
//!
//! Structured logging via tracing; the embedding host calls [`init`] once.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("almoner={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
