//! Global subscriber setup.

use quill_core::config::LoggingConfig;
use quill_core::error::{QuillError, Result};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::tracing_layer::{StreamTraceEvent, StreamTraceLayer};

/// Builds the filter: `RUST_LOG` when set, the configured directive otherwise.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| QuillError::config(format!("invalid logging.filter '{}': {}", config.filter, e)))
}

/// Installs the global subscriber.
///
/// Logs go to stderr, plain or JSON per `config.json`. When `trace` is given,
/// `quill::stream` events are also forwarded through a [`StreamTraceLayer`].
pub fn init_logging(
    config: &LoggingConfig,
    trace: Option<mpsc::UnboundedSender<StreamTraceEvent>>,
) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(trace.map(StreamTraceLayer::new));

    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    installed.map_err(|e| QuillError::internal(format!("failed to install subscriber: {}", e)))
}
