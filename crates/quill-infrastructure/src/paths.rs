//! Path management for quill configuration files.
//!
//! ```text
//! ~/.config/quill/             # Config directory
//! ├── config.toml              # Application configuration
//! └── traces/                  # Recorded event traces (JSONL)
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves quill's directories, optionally under an override root.
#[derive(Debug, Clone, Default)]
pub struct QuillPaths {
    base_override: Option<PathBuf>,
}

impl QuillPaths {
    /// Creates a resolver. `base_override` replaces the platform config
    /// directory (used by tests and by `--config`, which points at a file in it).
    pub fn new(base_override: Option<PathBuf>) -> Self {
        Self { base_override }
    }

    /// Returns the quill configuration directory (e.g. `~/.config/quill/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base_override {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("quill"))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn traces_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("traces"))
    }
}
