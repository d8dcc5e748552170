//! Image captioning.
//!
//! A [`Captioner`] turns an image file into a short description. Two backends
//! exist: BLIP on ONNX Runtime (`local`) and the same model behind the hosted
//! HuggingFace inference API (`huggingface`).
//!
//! # Usage
//!
//! ```rust,ignore
//! use taleweaver_core::caption::CaptionerFactory;
//!
//! let captioner = CaptionerFactory::create(&config, &secrets)?;
//! let caption = captioner.caption(Path::new("dog.jpg")).await?;
//! ```

pub(crate) mod blip;
pub(crate) mod huggingface;
pub(crate) mod local;
pub(crate) mod preprocess;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::{Config, Secrets};
use crate::error::PipelineError;

pub use blip::BlipModel;
pub use huggingface::HuggingFaceCaptioner;
pub use local::LocalCaptioner;

/// Trait that all captioning backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the pipeline holds a `Box<dyn Captioner>`).
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Describe the image stored at `image_path`.
    async fn caption(&self, image_path: &Path) -> Result<String, PipelineError>;
}

/// Paths of the three files making up a local captioning model.
#[derive(Debug, Clone)]
pub struct CaptionModelFiles {
    pub vision: PathBuf,
    pub decoder: PathBuf,
    pub tokenizer: PathBuf,
}

impl CaptionModelFiles {
    /// Resolve the model files from the configuration.
    pub fn from_config(config: &Config) -> Self {
        let dir = config.caption_model_dir();
        Self {
            vision: dir.join(&config.caption.vision_model_file),
            decoder: dir.join(&config.caption.decoder_model_file),
            tokenizer: dir.join(&config.caption.tokenizer_file),
        }
    }

    /// True if all three files are on disk.
    pub fn all_present(&self) -> bool {
        self.vision.exists() && self.decoder.exists() && self.tokenizer.exists()
    }
}

/// Factory that creates the configured captioning backend.
pub struct CaptionerFactory;

impl CaptionerFactory {
    /// Create the backend named by `caption.backend`.
    ///
    /// The local backend loads its ONNX sessions here, once; every later
    /// `caption` call reuses them.
    pub fn create(config: &Config, secrets: &Secrets) -> Result<Box<dyn Captioner>, PipelineError> {
        let cfg = &config.caption;
        match cfg.backend.as_str() {
            "local" => {
                let files = CaptionModelFiles::from_config(config);
                tracing::info!("Loading captioning model from {:?}", config.caption_model_dir());
                let model = BlipModel::load(&files.vision, &files.decoder, &files.tokenizer)?;
                tracing::info!("Captioning model loaded successfully");
                Ok(Box::new(LocalCaptioner::new(
                    model,
                    cfg.image_size,
                    cfg.max_new_tokens,
                )))
            }
            "huggingface" => {
                let token = secrets.caption_token.as_deref().ok_or_else(|| {
                    PipelineError::Caption {
                        path: PathBuf::new(),
                        message: "Captioning API token not set. Set HUGGINGFACEHUB_API_TOKEN."
                            .to_string(),
                    }
                })?;
                Ok(Box::new(HuggingFaceCaptioner::new(
                    &cfg.endpoint,
                    token,
                    cfg.max_new_tokens,
                )))
            }
            other => Err(PipelineError::Caption {
                path: PathBuf::new(),
                message: format!("Unknown captioning backend: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(caption_token: Option<&str>) -> Secrets {
        Secrets {
            story_token: "s".to_string(),
            speech_token: "t".to_string(),
            caption_token: caption_token.map(String::from),
        }
    }

    #[test]
    fn test_model_files_from_config() {
        let mut config = Config::default();
        config.general.model_dir = PathBuf::from("/models");
        let files = CaptionModelFiles::from_config(&config);
        assert_eq!(
            files.vision,
            PathBuf::from("/models/blip-image-captioning-base/vision_model.onnx")
        );
        assert_eq!(
            files.tokenizer,
            PathBuf::from("/models/blip-image-captioning-base/tokenizer.json")
        );
        assert!(!files.all_present());
    }

    #[test]
    fn test_factory_remote_backend() {
        let mut config = Config::default();
        config.caption.backend = "huggingface".to_string();
        let captioner = CaptionerFactory::create(&config, &secrets(Some("hf"))).unwrap();
        assert_eq!(captioner.name(), "huggingface");
    }

    #[test]
    fn test_factory_remote_backend_without_token() {
        let mut config = Config::default();
        config.caption.backend = "huggingface".to_string();
        let err = CaptionerFactory::create(&config, &secrets(None)).err().unwrap();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_factory_local_backend_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.model_dir = dir.path().to_path_buf();
        let err = CaptionerFactory::create(&config, &secrets(None)).err().unwrap();
        assert!(err.to_string().contains("models download"));
    }

    #[test]
    fn test_factory_unknown_backend() {
        let mut config = Config::default();
        config.caption.backend = "nope".to_string();
        let err = CaptionerFactory::create(&config, &secrets(None)).err().unwrap();
        assert!(err.to_string().contains("Unknown captioning backend"));
    }
}
