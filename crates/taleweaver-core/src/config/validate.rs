//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::types::SamplingParameters;

use super::Config;

/// Captioning backends understood by `CaptionerFactory`.
pub const CAPTION_BACKENDS: &[&str] = &["local", "huggingface"];

/// Largest accepted `limits.max_upload_mb`.
pub const MAX_UPLOAD_MB: u64 = 4096;

/// Levels accepted by `logging.level`.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_upload_mb == 0 || self.limits.max_upload_mb > MAX_UPLOAD_MB {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_upload_mb must be between 1 and {MAX_UPLOAD_MB}, got {}",
                self.limits.max_upload_mb
            )));
        }
        for (name, value) in [
            ("limits.caption_timeout_ms", self.limits.caption_timeout_ms),
            ("limits.story_timeout_ms", self.limits.story_timeout_ms),
            ("limits.speech_timeout_ms", self.limits.speech_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
            }
        }
        if !CAPTION_BACKENDS.contains(&self.caption.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "caption.backend must be one of {:?}, got {:?}",
                CAPTION_BACKENDS, self.caption.backend
            )));
        }
        if self.caption.max_new_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "caption.max_new_tokens must be > 0".into(),
            ));
        }
        if self.caption.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "caption.image_size must be > 0".into(),
            ));
        }
        if self.story.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "story.model must not be empty".into(),
            ));
        }
        SamplingParameters::new(self.story.top_k, self.story.top_p, self.story.temperature)
            .map_err(|e| ConfigError::ValidationError(format!("story defaults: {e}")))?;

        let output_file = self.speech.output_file.trim();
        if output_file.is_empty() || output_file.contains('/') || output_file.contains('\\') {
            return Err(ConfigError::ValidationError(
                "speech.output_file must be a plain file name".into(),
            ));
        }
        if !LOG_LEVELS
            .iter()
            .any(|level| level.eq_ignore_ascii_case(&self.logging.level))
        {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got {:?}",
                LOG_LEVELS, self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_upload_limit() {
        let mut config = Config::default();
        config.limits.max_upload_mb = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_upload_mb"));
    }

    #[test]
    fn test_validate_rejects_huge_upload_limit() {
        let mut config = Config::default();
        config.limits.max_upload_mb = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_upload_mb"));

        config.limits.max_upload_mb = MAX_UPLOAD_MB;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_upload_limit_rejected_on_parse() {
        let err = Config::from_toml("[limits]\nmax_upload_mb = 1000000").unwrap_err();
        assert!(err.to_string().contains("max_upload_mb"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.story_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("story_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_unknown_backend() {
        let mut config = Config::default();
        config.caption.backend = "replicate".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("caption.backend"));
    }

    #[test]
    fn test_validate_rejects_zero_token_cap() {
        let mut config = Config::default();
        config.caption.max_new_tokens = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_new_tokens"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_sampling_defaults() {
        let mut config = Config::default();
        config.story.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));

        let mut config = Config::default();
        config.story.top_k = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_validate_rejects_output_file_with_directory() {
        let mut config = Config::default();
        config.speech.output_file = "../audio.mp3".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_file"));
    }
}
