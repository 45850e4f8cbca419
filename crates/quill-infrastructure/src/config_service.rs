//! Configuration service.
//!
//! Loads [`QuillConfig`] from `config.toml` and caches it. A missing or empty
//! file yields the defaults. Saves go through a temporary file plus rename so
//! a crash never leaves a half-written config behind.

use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use quill_core::config::QuillConfig;
use quill_core::error::{QuillError, Result};

use crate::paths::QuillPaths;

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    cached: Arc<RwLock<Option<QuillConfig>>>,
}

impl ConfigService {
    /// Uses the platform config file (`~/.config/quill/config.toml`).
    pub fn new() -> Result<Self> {
        let path = QuillPaths::default()
            .config_file()
            .map_err(|e| QuillError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, loading it on first access.
    pub fn get_config(&self) -> Result<QuillConfig> {
        if let Some(cached) = self.read_cache()? {
            return Ok(cached);
        }

        let loaded = self.load()?;
        let mut guard = self
            .cached
            .write()
            .map_err(|_| QuillError::internal("config cache lock poisoned"))?;
        *guard = Some(loaded.clone());
        Ok(loaded)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }

    /// Validates and writes `config`, then refreshes the cache.
    pub fn save(&self, config: &QuillConfig) -> Result<()> {
        config.validate()?;

        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(config)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        tracing::info!("[ConfigService] Saved config to {}", self.path.display());

        self.invalidate_cache();
        Ok(())
    }

    fn read_cache(&self) -> Result<Option<QuillConfig>> {
        let guard = self
            .cached
            .read()
            .map_err(|_| QuillError::internal("config cache lock poisoned"))?;
        Ok(guard.clone())
    }

    fn load(&self) -> Result<QuillConfig> {
        if !self.path.exists() {
            tracing::debug!(
                "[ConfigService] No config at {}, using defaults",
                self.path.display()
            );
            return Ok(QuillConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(QuillConfig::default());
        }

        let config: QuillConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| QuillError::config("config path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| QuillError::config("config path has no file name"))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        assert_eq!(service.get_config().unwrap(), QuillConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let service = ConfigService::with_path(path.clone());

        let mut config = QuillConfig::default();
        config.logging.json = true;
        config.stream.event_buffer = 16;
        service.save(&config).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join("nested").join(".config.toml.tmp").exists());
        assert_eq!(service.get_config().unwrap(), config);
    }

    #[test]
    fn test_invalid_values_are_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[stream]\nedit_buffer = 0\n").unwrap();

        let service = ConfigService::with_path(path);
        assert!(service.get_config().unwrap_err().is_config());
    }

    #[test]
    fn test_malformed_toml_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[stream\n").unwrap();

        let service = ConfigService::with_path(path);
        assert!(matches!(
            service.get_config(),
            Err(QuillError::Serialization { .. })
        ));
    }
}
