//! Configuration system for muisti.
//!
//! Configuration is fixed at construction time: build a [`Config`] (directly
//! or via [`Config::load`]) and hand it to `MemoryStore::open`.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;

use crate::errors::Error;
use serde::Deserialize;
use std::path::PathBuf;

pub use loader::ConfigFile;

/// Default minimum similarity for search results.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
/// Default number of texts per `batch_embed` call.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;
/// Default worker pool size.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding snapshot files.
    pub storage_path: PathBuf,

    /// Store name; the snapshot file is `<index_name>.json`.
    pub index_name: String,

    /// HuggingFace embedding model identifier used by `OnnxGateway`.
    pub embedding_model: String,

    /// Minimum similarity for a search hit.
    pub similarity_threshold: f64,

    /// Use the accelerated index when the backend is available.
    pub use_acceleration: bool,

    /// Texts per `batch_embed` call in batch adds.
    pub embedding_batch_size: usize,

    /// Threads for batch embedding and background persistence.
    pub worker_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        // Use home directory with sensible fallback for systems without HOME
        let home = dirs::home_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        });

        Self {
            storage_path: home.join(".muisti"),
            index_name: "memories".to_string(),
            embedding_model: "BAAI/bge-small-en-v1.5".to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            use_acceleration: true,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
        }
    }
}

impl Config {
    /// Load configuration with defaults, file values, and environment overrides.
    pub fn load() -> Result<Self, Error> {
        let file_config = loader::load_from_file()?;

        let mut config = Config::default();

        if let Some(mut file) = file_config {
            if let Some(path) = file.storage_path.as_mut() {
                *path = paths::resolve_storage_path(path)?;
            }
            config.merge_from_file(file);
        }

        overrides::apply_env_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Same defaults, different storage directory.
    pub fn with_storage_path(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Self::default()
        }
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) {
        if let Some(storage_path) = file.storage_path {
            self.storage_path = storage_path;
        }
        if let Some(index_name) = file.index_name {
            self.index_name = index_name;
        }
        if let Some(embedding_model) = file.embedding_model {
            self.embedding_model = embedding_model;
        }
        if let Some(threshold) = file.similarity_threshold {
            self.similarity_threshold = threshold;
        }
        if let Some(use_acceleration) = file.use_acceleration {
            self.use_acceleration = use_acceleration;
        }
        if let Some(batch_size) = file.embedding_batch_size {
            self.embedding_batch_size = batch_size;
        }
        if let Some(pool_size) = file.worker_pool_size {
            self.worker_pool_size = pool_size;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        validation::ConfigValidator { config: self }.validate()
    }

    /// Snapshot file for this store.
    pub fn snapshot_path(&self) -> PathBuf {
        crate::persistence::snapshot_path(&self.storage_path, &self.index_name)
    }

    /// Ensure the storage directory exists.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        if !self.storage_path.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.storage_path).map_err(|e| {
                Error::Config(format!(
                    "Failed to create storage directory {}: {e}",
                    self.storage_path.display()
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::tests_utils::{ENV_MUTEX, cleanup_env_vars, set_env};
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage_path.ends_with(".muisti"));
        assert_eq!(config.index_name, "memories");
        assert_eq!(config.embedding_model, "BAAI/bge-small-en-v1.5");
        assert_eq!(config.similarity_threshold, 0.7);
        assert!(config.use_acceleration);
        assert_eq!(config.embedding_batch_size, 32);
        assert_eq!(config.worker_pool_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_snapshot_path_uses_index_name() {
        let config = Config {
            index_name: "agent-a".to_string(),
            ..Config::with_storage_path("/data")
        };
        assert_eq!(config.snapshot_path(), PathBuf::from("/data/agent-a.json"));
    }

    #[test]
    fn test_merge_from_file_keeps_unset_fields() {
        let mut config = Config::default();
        let file: ConfigFile = toml::from_str(
            r#"
            index_name = "scratch"
            use_acceleration = false
            "#,
        )
        .unwrap();
        config.merge_from_file(file);

        assert_eq!(config.index_name, "scratch");
        assert!(!config.use_acceleration);
        assert_eq!(config.similarity_threshold, 0.7);
        assert_eq!(config.worker_pool_size, 4);
    }

    #[test]
    fn test_config_load_env_override() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        set_env("MUISTI_INDEX_NAME", "from-env");
        let config = Config::load();
        cleanup_env_vars();

        assert_eq!(config.unwrap().index_name, "from-env");
    }

    #[test]
    fn test_config_load_rejects_invalid_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        set_env("MUISTI_SIMILARITY_THRESHOLD", "1.5");
        let result = Config::load();
        cleanup_env_vars();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ensure_directories_creates_storage() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::with_storage_path(dir.path().join("nested").join("store"));
        config.ensure_directories().unwrap();
        assert!(config.storage_path.is_dir());
    }
}
