//! Configuration file loading and parsing.

use crate::errors::Error;
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration loaded from TOML file. Absent keys keep the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub storage_path: Option<PathBuf>,
    pub index_name: Option<String>,
    pub embedding_model: Option<String>,
    pub similarity_threshold: Option<f64>,
    pub use_acceleration: Option<bool>,
    pub embedding_batch_size: Option<usize>,
    pub worker_pool_size: Option<usize>,
}

/// Location of the config file: `<config_dir>/muisti/config.toml`.
pub fn config_file_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let config_dir = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
    config_dir.join("muisti/config.toml")
}

/// Load configuration from TOML file.
pub fn load_from_file() -> Result<Option<ConfigFile>, Error> {
    let config_path = config_file_path();

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {e}",
                config_path.display()
            ))
        })?;

        let config: ConfigFile = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file {}: {e}",
                config_path.display()
            ))
        })?;

        Ok(Some(config))
    } else {
        Ok(None)
    }
}
