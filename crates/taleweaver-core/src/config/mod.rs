//! Configuration management for Taleweaver.
//!
//! Configuration is loaded from `config.toml` in the platform config directory
//! with sensible defaults. API tokens are resolved once, at startup, into a
//! [`Secrets`] value that is handed to the pipeline components.

mod secrets;
mod types;
mod validate;

pub use secrets::Secrets;
pub use types::*;
pub use validate::CAPTION_BACKENDS;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Taleweaver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Session workspace settings
    pub workspace: WorkspaceConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Image captioning settings
    pub caption: CaptionConfig,

    /// Story generation settings
    pub story: StoryConfig,

    /// Speech synthesis settings
    pub speech: SpeechConfig,

    /// Web server settings
    pub server: ServerConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.taleweaver.taleweaver/config.toml
    /// - Linux: ~/.config/taleweaver/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\taleweaver\config\config.toml
    ///
    /// Falls back to ~/.taleweaver/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "taleweaver", "taleweaver")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".taleweaver").join("config.toml")
            })
    }

    /// Get the resolved model directory path (with ~ expansion).
    pub fn model_dir(&self) -> PathBuf {
        expand(&self.general.model_dir)
    }

    /// Get the resolved session workspace root (with ~ expansion).
    pub fn workspace_dir(&self) -> PathBuf {
        expand(&self.workspace.dir)
    }

    /// Directory holding the configured captioning model files.
    pub fn caption_model_dir(&self) -> PathBuf {
        self.model_dir().join(&self.caption.model)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.caption.max_new_tokens, 20);
        assert_eq!(config.story.top_k, 5);
        assert_eq!(config.speech.output_file, "audio_story.mp3");
        assert!(config.speech.check_status);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[caption]"));
        assert!(toml.contains("[story]"));
        assert!(toml.contains("[speech]"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [story]
            model = "meta-llama/Llama-3-8b-chat-hf"

            [speech]
            check_status = false
            "#,
        )
        .unwrap();
        assert_eq!(config.story.model, "meta-llama/Llama-3-8b-chat-hf");
        assert_eq!(config.story.endpoint, "https://api.together.xyz/inference");
        assert!(!config.speech.check_status);
        assert_eq!(config.caption.backend, "local");
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let err = Config::from_toml("[caption]\nmax_new_tokens = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));

        let err = Config::from_toml("[caption\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, Config::default().server.port);

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        assert_eq!(Config::load_or_default(&path).unwrap().server.port, 9100);
    }

    #[test]
    fn test_tilde_expansion() {
        let mut config = Config::default();
        config.workspace.dir = PathBuf::from("/tmp/tw-sessions");
        assert_eq!(config.workspace_dir(), PathBuf::from("/tmp/tw-sessions"));

        let config = Config::default();
        assert!(!config.model_dir().to_string_lossy().starts_with('~'));
        assert!(config
            .caption_model_dir()
            .ends_with("blip-image-captioning-base"));
    }
}
