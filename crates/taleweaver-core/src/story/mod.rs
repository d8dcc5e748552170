//! Story generation from a caption via a hosted LLM.

pub(crate) mod prompt;
pub(crate) mod together;

use async_trait::async_trait;

use crate::config::{Config, Secrets};
use crate::error::PipelineError;
use crate::types::SamplingParameters;

pub use prompt::{story_prompt, ChatMessage, SYSTEM_INSTRUCTION};
pub use together::TogetherStoryGenerator;

/// Trait that story backends implement.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Write a short titled story inspired by `caption`.
    ///
    /// `sampling` is forwarded to the model exactly as given.
    async fn generate(
        &self,
        caption: &str,
        sampling: &SamplingParameters,
    ) -> Result<String, PipelineError>;
}

/// Build the configured story generator.
pub fn from_config(config: &Config, secrets: &Secrets) -> Box<dyn StoryGenerator> {
    Box::new(TogetherStoryGenerator::new(
        &config.story.endpoint,
        &secrets.story_token,
        &config.story.model,
    ))
}
