//! Taleweaver Core - turns a picture into a short spoken story.
//!
//! An uploaded image is captioned, the caption seeds a short story written by
//! a hosted LLM, and the story is rendered to audio:
//!
//! ```text
//! Image → Caption (BLIP) → Story (chat LLM) → Speech (TTS) → audio file
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use taleweaver_core::{Config, SamplingParameters, Secrets, StoryPipeline};
//!
//! #[tokio::main]
//! async fn main() -> taleweaver_core::Result<()> {
//!     let config = Config::load_or_default(&Config::default_path())?;
//!     let secrets = Secrets::resolve(&config)?;
//!     let pipeline = StoryPipeline::from_config(&config, &secrets)?;
//!
//!     let outcome = pipeline
//!         .run_file("./dog.jpg".as_ref(), SamplingParameters::default())
//!         .await?;
//!     println!("{}", outcome.story);
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod speech;
pub mod story;
pub mod types;

#[cfg(test)]
mod testutil;

pub use caption::{Captioner, CaptionerFactory};
pub use config::{Config, Secrets};
pub use error::{ConfigError, PipelineError, PipelineResult, Result, TaleweaverError};
pub use pipeline::{SessionWorkspace, StoryPipeline};
pub use speech::SpeechSynthesizer;
pub use story::StoryGenerator;
pub use types::{
    AudioArtifact, ImageKind, SamplingParameters, StageTimings, StoryOutcome, UploadedImage,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
