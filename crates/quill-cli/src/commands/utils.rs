use anyhow::{Context, Result};
use quill_core::config::QuillConfig;
use quill_execution::StreamTraceEvent;
use quill_infrastructure::{ConfigService, QuillPaths};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Builds the config service and path layout, honouring `--config`.
///
/// With an explicit config file, the `traces/` directory is looked up next to it.
pub fn config_service(config: Option<&Path>) -> Result<(ConfigService, QuillPaths)> {
    match config {
        Some(path) => {
            let paths = QuillPaths::new(path.parent().map(Path::to_path_buf));
            Ok((ConfigService::with_path(path.to_path_buf()), paths))
        }
        None => {
            let service = ConfigService::new().context("Failed to locate the config directory")?;
            Ok((service, QuillPaths::default()))
        }
    }
}

/// Installs logging and, when `stream.forward_trace` is set, returns the
/// receiver for forwarded protocol events.
pub fn init_logging(config: &QuillConfig) -> Result<Option<mpsc::UnboundedReceiver<StreamTraceEvent>>> {
    if config.stream.forward_trace {
        let (tx, rx) = mpsc::unbounded_channel();
        quill_execution::init_logging(&config.logging, Some(tx))
            .context("Failed to initialise logging")?;
        Ok(Some(rx))
    } else {
        quill_execution::init_logging(&config.logging, None)
            .context("Failed to initialise logging")?;
        Ok(None)
    }
}

/// Resolves a trace argument. A relative path that does not exist is tried
/// under the traces directory.
pub fn resolve_trace_path(trace: &Path, paths: &QuillPaths) -> PathBuf {
    if trace.is_absolute() || trace.exists() {
        return trace.to_path_buf();
    }
    match paths.traces_dir() {
        Ok(dir) if dir.join(trace).exists() => dir.join(trace),
        _ => trace.to_path_buf(),
    }
}
