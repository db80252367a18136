//! Configuration validation logic.

use crate::errors::Error;

use super::{Config, paths};

/// Validates configuration values.
pub struct ConfigValidator<'a> {
    pub config: &'a Config,
}

impl ConfigValidator<'_> {
    /// Validate all configuration values for correctness and constraints.
    ///
    /// Checks that:
    /// - Similarity threshold is finite and between 0.0 and 1.0
    /// - Batch size and worker pool size are at least 1
    /// - Index name is a plain, non-empty file stem
    /// - Storage path is not empty and has no `..` components
    /// - Embedding model is not empty
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any validation check fails.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_similarity_threshold()?;
        self.validate_sizes()?;
        self.validate_index_name()?;
        self.validate_storage_path()?;
        self.validate_embedding_model()?;

        Ok(())
    }

    fn validate_similarity_threshold(&self) -> Result<(), Error> {
        let threshold = self.config.similarity_threshold;
        if !threshold.is_finite() {
            return Err(Error::Config(
                "Invalid similarity threshold: NaN and infinity are not allowed".into(),
            ));
        }

        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "Invalid similarity threshold: {} (must be between 0.0 and 1.0)",
                threshold
            )));
        }

        Ok(())
    }

    fn validate_sizes(&self) -> Result<(), Error> {
        if self.config.embedding_batch_size == 0 {
            return Err(Error::Config(
                "Embedding batch size must be at least 1".to_string(),
            ));
        }
        if self.config.worker_pool_size == 0 {
            return Err(Error::Config(
                "Worker pool size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_index_name(&self) -> Result<(), Error> {
        let name = self.config.index_name.trim();
        if name.is_empty() {
            return Err(Error::Config("Index name cannot be empty".to_string()));
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "Invalid index name {:?}: must be a plain file name",
                self.config.index_name
            )));
        }
        Ok(())
    }

    fn validate_storage_path(&self) -> Result<(), Error> {
        paths::check_storage_path(&self.config.storage_path)
    }

    fn validate_embedding_model(&self) -> Result<(), Error> {
        if self.config.embedding_model.trim().is_empty() {
            return Err(Error::Config("Embedding model cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::with_storage_path("/test/store")
    }

    fn check(config: &Config) -> Result<(), Error> {
        ConfigValidator { config }.validate()
    }

    #[test]
    fn test_valid_config() {
        assert!(check(&valid()).is_ok());
    }

    #[test]
    fn test_similarity_threshold_range_validation() {
        let config = Config {
            similarity_threshold: 1.5,
            ..valid()
        };
        assert!(matches!(check(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_valid_similarity_threshold_bounds() {
        let mut config = Config {
            similarity_threshold: 0.0,
            ..valid()
        };
        assert!(check(&config).is_ok());

        config.similarity_threshold = 1.0;
        assert!(check(&config).is_ok());
    }

    #[test]
    fn test_similarity_threshold_nan_rejected() {
        let config = Config {
            similarity_threshold: f64::NAN,
            ..valid()
        };
        assert!(matches!(check(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_similarity_threshold_infinity_rejected() {
        let config = Config {
            similarity_threshold: f64::INFINITY,
            ..valid()
        };
        assert!(matches!(check(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = Config {
            embedding_batch_size: 0,
            ..valid()
        };
        assert!(matches!(check(&config), Err(Error::Config(_))));

        let config = Config {
            worker_pool_size: 0,
            ..valid()
        };
        assert!(matches!(check(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_index_name_must_be_plain() {
        for name in ["", "   ", "..", "a/b", "a\\b"] {
            let config = Config {
                index_name: name.to_string(),
                ..valid()
            };
            assert!(
                matches!(check(&config), Err(Error::Config(_))),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn test_storage_path_traversal_rejected() {
        let config = Config::with_storage_path("../../etc");
        assert!(matches!(check(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_embedding_model_rejected() {
        let config = Config {
            embedding_model: " ".to_string(),
            ..valid()
        };
        assert!(matches!(check(&config), Err(Error::Config(_))));
    }
}
