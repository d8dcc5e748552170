//! Speech synthesis of the generated story.

pub(crate) mod huggingface;

use std::path::Path;

use async_trait::async_trait;

use crate::config::{Config, Secrets};
use crate::error::PipelineError;
use crate::types::AudioArtifact;

pub use huggingface::HuggingFaceSpeech;

/// Trait that speech backends implement.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Render `text` as audio and write it to `dest`, replacing any existing file.
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<AudioArtifact, PipelineError>;
}

/// Build the configured speech synthesizer.
pub fn from_config(config: &Config, secrets: &Secrets) -> Box<dyn SpeechSynthesizer> {
    Box::new(HuggingFaceSpeech::new(
        &config.speech.endpoint,
        &secrets.speech_token,
        config.speech.check_status,
    ))
}
