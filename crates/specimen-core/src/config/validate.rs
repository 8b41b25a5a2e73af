//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }

        let classifier = &self.classifier;
        if classifier.sample_size == 0 || classifier.corner_size == 0 {
            return Err(ConfigError::ValidationError(
                "classifier.sample_size and classifier.corner_size must be > 0".into(),
            ));
        }
        if classifier.corner_size * 2 > classifier.sample_size {
            return Err(ConfigError::ValidationError(
                "classifier.corner_size must be at most half of classifier.sample_size".into(),
            ));
        }
        if classifier.edge_rows * 2 > classifier.sample_size {
            return Err(ConfigError::ValidationError(
                "classifier.edge_rows must be at most half of classifier.sample_size".into(),
            ));
        }
        if !(0.0..=1.0).contains(&classifier.white_ratio_threshold) {
            return Err(ConfigError::ValidationError(
                "classifier.white_ratio_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.removal.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "removal.timeout_ms must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.normalize.padding_percent) {
            return Err(ConfigError::ValidationError(
                "normalize.padding_percent must be between 0.0 and 1.0".into(),
            ));
        }
        if !(1..=100).contains(&self.normalize.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "normalize.jpeg_quality must be between 1 and 100".into(),
            ));
        }

        if self.batch.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "batch.parallel_workers must be > 0".into(),
            ));
        }
        Ok(())
    }
}
