//! Logging configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::{Error, Result};

/// Configure stdout logging, honouring `RUST_LOG`.
///
/// With `json` set, events are written as one JSON object per line.
pub fn configure_tracing(json: bool) -> Result<()> {
    // Basic EnvFilter
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,workbox=debug".into()),
    );

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))
}
