//! API tokens resolved from configuration.

use std::fmt;

use super::Config;
use crate::error::ConfigError;

/// Shown in place of a literal token.
const REDACTED: &str = "<redacted>";

/// Resolve `${ENV_VAR}` references in config strings; other values pass through.
fn resolve_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    if is_env_reference(value) {
        let var_name = &value[2..value.len() - 1];
        lookup(var_name).filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Bearer tokens for the remote services, resolved once per process.
#[derive(Clone)]
pub struct Secrets {
    /// Token for the chat-completion endpoint
    pub story_token: String,
    /// Token for the speech-synthesis endpoint
    pub speech_token: String,
    /// Token for the hosted captioning endpoint (remote backend only)
    pub caption_token: Option<String>,
}

impl Secrets {
    /// Resolve all tokens the configured pipeline needs from the process environment.
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve_using(config, |name| std::env::var(name).ok())
    }

    /// Resolve tokens with a custom variable lookup.
    pub fn resolve_using(
        config: &Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let story_token = resolve_with(&config.story.api_key, &lookup)
            .ok_or_else(|| missing("story.api_key", &config.story.api_key))?;
        let speech_token = resolve_with(&config.speech.api_key, &lookup)
            .ok_or_else(|| missing("speech.api_key", &config.speech.api_key))?;

        let caption_token = if config.caption.backend == "huggingface" {
            Some(
                resolve_with(&config.caption.api_key, &lookup)
                    .ok_or_else(|| missing("caption.api_key", &config.caption.api_key))?,
            )
        } else {
            None
        };

        Ok(Self {
            story_token,
            speech_token,
            caption_token,
        })
    }
}

fn is_env_reference(value: &str) -> bool {
    value.starts_with("${") && value.ends_with('}')
}

fn redact(value: &mut String) {
    if !value.is_empty() && !is_env_reference(value) {
        *value = REDACTED.to_string();
    }
}

impl Config {
    /// A copy safe to print: literal API tokens are masked, `${ENV}`
    /// references are kept.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        redact(&mut config.caption.api_key);
        redact(&mut config.story.api_key);
        redact(&mut config.speech.api_key);
        config
    }
}

fn missing(key: &str, raw: &str) -> ConfigError {
    let hint = if is_env_reference(raw) {
        format!(
            "set the {} environment variable or `taleweaver config set {key} <token>`",
            &raw[2..raw.len() - 1]
        )
    } else {
        format!("run `taleweaver config set {key} <token>`")
    };
    ConfigError::MissingSecret {
        name: key.to_string(),
        hint,
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("story_token", &REDACTED)
            .field("speech_token", &REDACTED)
            .field("caption_token", &self.caption_token.as_ref().map(|_| REDACTED))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "TOGETHER_API_KEY" => Some("together-secret".to_string()),
            "HUGGINGFACEHUB_API_TOKEN" => Some("hf-secret".to_string()),
            "EMPTY_VAR" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_with("plain-key", env), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_with("", env), None);
        // Unset env var returns None
        assert_eq!(resolve_with("${DEFINITELY_NOT_SET_XYZ_123}", env), None);
        assert_eq!(
            resolve_with("${TOGETHER_API_KEY}", env),
            Some("together-secret".to_string())
        );
    }

    #[test]
    fn test_redacted_masks_literal_tokens_only() {
        let mut config = Config::default();
        config.story.api_key = "tgr-literal-secret".to_string();
        config.caption.api_key = String::new();

        let shown = config.redacted();
        assert_eq!(shown.story.api_key, "<redacted>");
        assert_eq!(shown.speech.api_key, "${HUGGINGFACEHUB_API_TOKEN}");
        assert_eq!(shown.caption.api_key, "");
        assert!(!shown.to_toml().unwrap().contains("tgr-literal-secret"));
        assert_eq!(config.story.api_key, "tgr-literal-secret");
    }

    #[test]
    fn test_empty_env_value_counts_as_missing() {
        assert_eq!(resolve_with("${EMPTY_VAR}", env), None);
    }

    #[test]
    fn test_resolve_defaults_from_environment() {
        let config = Config::default();
        let secrets = Secrets::resolve_using(&config, env).unwrap();
        assert_eq!(secrets.story_token, "together-secret");
        assert_eq!(secrets.speech_token, "hf-secret");
        assert!(secrets.caption_token.is_none());
    }

    #[test]
    fn test_remote_caption_backend_needs_token() {
        let mut config = Config::default();
        config.caption.backend = "huggingface".to_string();
        let secrets = Secrets::resolve_using(&config, env).unwrap();
        assert_eq!(secrets.caption_token.as_deref(), Some("hf-secret"));

        let err = Secrets::resolve_using(&config, |name| {
            (name == "TOGETHER_API_KEY").then(|| "x".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("speech.api_key"));
    }

    #[test]
    fn test_missing_story_token_names_variable() {
        let config = Config::default();
        let err = Secrets::resolve_using(&config, |_| None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("story.api_key"));
        assert!(msg.contains("TOGETHER_API_KEY"));
    }

    #[test]
    fn test_literal_tokens() {
        let mut config = Config::default();
        config.story.api_key = "literal-story".to_string();
        config.speech.api_key = "literal-speech".to_string();
        let secrets = Secrets::resolve_using(&config, |_| None).unwrap();
        assert_eq!(secrets.story_token, "literal-story");
        assert_eq!(secrets.speech_token, "literal-speech");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let config = Config::default();
        let secrets = Secrets::resolve_using(&config, env).unwrap();
        let debug = format!("{secrets:?}");
        assert!(!debug.contains("together-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
