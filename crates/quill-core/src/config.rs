use serde::{Deserialize, Serialize};

use crate::error::{QuillError, Result};

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct QuillConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl QuillConfig {
    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.stream.event_buffer == 0 {
            return Err(QuillError::config("stream.event_buffer must be greater than 0"));
        }
        if self.stream.edit_buffer == 0 {
            return Err(QuillError::config("stream.edit_buffer must be greater than 0"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(QuillError::config("logging.filter must not be empty"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of the inbound event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Capacity of the user-edit channel.
    #[serde(default = "default_edit_buffer")]
    pub edit_buffer: usize,
    /// Forward `quill::stream` log events to the hosting UI.
    #[serde(default)]
    pub forward_trace: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            edit_buffer: default_edit_buffer(),
            forward_trace: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_event_buffer() -> usize {
    256
}

fn default_edit_buffer() -> usize {
    64
}
