//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where local models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.taleweaver/models"),
        }
    }
}

/// Where per-request session directories are created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory; each request gets `{dir}/{session_id}/`
    pub dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("~/.taleweaver/sessions"),
        }
    }
}

/// Resource limits and per-stage time budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_upload_mb: u64,

    /// Captioning timeout in milliseconds (includes model warm-up)
    pub caption_timeout_ms: u64,

    /// Story generation timeout in milliseconds
    pub story_timeout_ms: u64,

    /// Speech synthesis timeout in milliseconds
    pub speech_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 20,
            caption_timeout_ms: 60_000,
            story_timeout_ms: 120_000,
            speech_timeout_ms: 120_000,
        }
    }
}

/// Image captioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// "local" (ONNX Runtime) or "huggingface" (hosted inference API)
    pub backend: String,

    /// Model name; the local backend looks in `{model_dir}/{model}/`
    pub model: String,

    /// Upper bound on generated caption tokens
    pub max_new_tokens: u32,

    /// Square input resolution of the vision encoder
    pub image_size: u32,

    /// Hosted inference endpoint (huggingface backend)
    pub endpoint: String,

    /// API token (supports ${ENV_VAR} syntax, huggingface backend only)
    pub api_key: String,

    /// Vision encoder file name inside the model directory
    pub vision_model_file: String,

    /// Text decoder file name inside the model directory
    pub decoder_model_file: String,

    /// Tokenizer file name inside the model directory
    pub tokenizer_file: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            model: "blip-image-captioning-base".to_string(),
            max_new_tokens: 20,
            image_size: 384,
            endpoint: "https://api-inference.huggingface.co/models/Salesforce/blip-image-captioning-base"
                .to_string(),
            api_key: "${HUGGINGFACEHUB_API_TOKEN}".to_string(),
            vision_model_file: "vision_model.onnx".to_string(),
            decoder_model_file: "text_decoder.onnx".to_string(),
            tokenizer_file: "tokenizer.json".to_string(),
        }
    }
}

/// Story generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Chat-completion endpoint
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// API token (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Default Top-K offered by the form and the CLI
    pub top_k: u32,

    /// Default Top-P offered by the form and the CLI
    pub top_p: f32,

    /// Default temperature offered by the form and the CLI
    pub temperature: f32,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.together.xyz/inference".to_string(),
            model: "togethercomputer/llama-2-70b-chat".to_string(),
            api_key: "${TOGETHER_API_KEY}".to_string(),
            top_k: 5,
            top_p: 0.8,
            temperature: 1.5,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speech-synthesis endpoint
    pub endpoint: String,

    /// API token (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// File name of the audio artifact inside each session directory
    pub output_file: String,

    /// Reject non-2xx responses instead of writing the body to disk.
    /// Set to false to keep whatever the endpoint returns, error pages included.
    pub check_status: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint:
                "https://api-inference.huggingface.co/models/espnet/kan-bayashi_ljspeech_vits"
                    .to_string(),
            api_key: "${HUGGINGFACEHUB_API_TOKEN}".to_string(),
            output_file: "audio_story.mp3".to_string(),
            check_status: true,
        }
    }
}

/// Web server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
