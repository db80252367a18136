//! Environment variable overrides for configuration.

use crate::errors::Error;

use super::Config;
use super::env_parser::{parse_env_bool, parse_env_number, parse_env_path, parse_env_string, read};

/// Apply `MUISTI_*` environment variable overrides to configuration.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), Error> {
    if let Some(val) = read("MUISTI_STORAGE_PATH") {
        config.storage_path = parse_env_path("MUISTI_STORAGE_PATH", &val)?;
    }
    if let Some(val) = read("MUISTI_INDEX_NAME") {
        config.index_name = parse_env_string("MUISTI_INDEX_NAME", &val)?;
    }
    if let Some(val) = read("MUISTI_EMBEDDING_MODEL") {
        config.embedding_model = parse_env_string("MUISTI_EMBEDDING_MODEL", &val)?;
    }
    if let Some(val) = read("MUISTI_SIMILARITY_THRESHOLD") {
        config.similarity_threshold = parse_env_number("MUISTI_SIMILARITY_THRESHOLD", &val)?;
    }
    if let Some(val) = read("MUISTI_USE_ACCELERATION") {
        config.use_acceleration = parse_env_bool("MUISTI_USE_ACCELERATION", &val)?;
    }
    if let Some(val) = read("MUISTI_EMBEDDING_BATCH_SIZE") {
        config.embedding_batch_size = parse_env_number("MUISTI_EMBEDDING_BATCH_SIZE", &val)?;
    }
    if let Some(val) = read("MUISTI_WORKER_POOL_SIZE") {
        config.worker_pool_size = parse_env_number("MUISTI_WORKER_POOL_SIZE", &val)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests_utils::{ENV_MUTEX, cleanup_env_vars, set_env};
    use std::path::PathBuf;

    #[test]
    fn test_env_var_overrides_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        set_env("MUISTI_STORAGE_PATH", "/custom/store");
        set_env("MUISTI_INDEX_NAME", "agent-7");
        set_env("MUISTI_EMBEDDING_MODEL", "env/model");
        set_env("MUISTI_SIMILARITY_THRESHOLD", "0.95");
        set_env("MUISTI_USE_ACCELERATION", "false");
        set_env("MUISTI_EMBEDDING_BATCH_SIZE", "8");
        set_env("MUISTI_WORKER_POOL_SIZE", "2");

        let mut config = Config::default();
        let result = apply_env_overrides(&mut config);
        cleanup_env_vars();
        result.unwrap();

        assert_eq!(config.storage_path, PathBuf::from("/custom/store"));
        assert_eq!(config.index_name, "agent-7");
        assert_eq!(config.embedding_model, "env/model");
        assert_eq!(config.similarity_threshold, 0.95);
        assert!(!config.use_acceleration);
        assert_eq!(config.embedding_batch_size, 8);
        assert_eq!(config.worker_pool_size, 2);
    }

    #[test]
    fn test_invalid_similarity_threshold() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        set_env("MUISTI_SIMILARITY_THRESHOLD", "invalid");
        let result = apply_env_overrides(&mut Config::default());
        cleanup_env_vars();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_env_var_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        set_env("MUISTI_STORAGE_PATH", "");
        let result = apply_env_overrides(&mut Config::default());
        cleanup_env_vars();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_whitespace_env_var_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        set_env("MUISTI_EMBEDDING_MODEL", "   ");
        let result = apply_env_overrides(&mut Config::default());
        cleanup_env_vars();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unset_vars_leave_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        cleanup_env_vars();

        let mut config = Config::default();
        apply_env_overrides(&mut config).unwrap();

        assert_eq!(config.index_name, "memories");
        assert_eq!(config.similarity_threshold, 0.7);
    }
}
