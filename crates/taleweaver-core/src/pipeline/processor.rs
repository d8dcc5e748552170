//! Pipeline orchestration - wires caption, story and speech together.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::caption::{Captioner, CaptionerFactory};
use crate::config::{Config, LimitsConfig, Secrets};
use crate::error::PipelineError;
use crate::speech::{self, SpeechSynthesizer};
use crate::story::{self, StoryGenerator};
use crate::types::{ImageKind, SamplingParameters, StageTimings, StoryOutcome, UploadedImage};

use super::validate::Validator;
use super::workspace::SessionWorkspace;

/// Runs one uploaded image through caption, story and speech.
///
/// The pipeline is shared between requests (`Arc<StoryPipeline>` in the web
/// server); all per-request state lives in the [`SessionWorkspace`].
pub struct StoryPipeline {
    captioner: Box<dyn Captioner>,
    story: Box<dyn StoryGenerator>,
    speech: Box<dyn SpeechSynthesizer>,
    validator: Validator,
    limits: LimitsConfig,
    workspace_root: PathBuf,
    audio_file: String,
}

impl StoryPipeline {
    /// Assemble a pipeline from already constructed stages.
    pub fn new(
        captioner: Box<dyn Captioner>,
        story: Box<dyn StoryGenerator>,
        speech: Box<dyn SpeechSynthesizer>,
        config: &Config,
    ) -> Self {
        Self {
            captioner,
            story,
            speech,
            validator: Validator::new(config.limits.clone()),
            limits: config.limits.clone(),
            workspace_root: config.workspace_dir(),
            audio_file: config.speech.output_file.clone(),
        }
    }

    /// Build the configured backends and assemble the pipeline.
    ///
    /// With the local captioning backend this loads the ONNX model.
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<Self, PipelineError> {
        let captioner = CaptionerFactory::create(config, secrets)?;
        let story = story::from_config(config, secrets);
        let speech = speech::from_config(config, secrets);
        tracing::info!(
            "Pipeline ready: caption={}, story={}, speech={}",
            captioner.name(),
            story.name(),
            speech.name()
        );
        Ok(Self::new(captioner, story, speech, config))
    }

    /// Root directory holding all session directories.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Allocate a fresh session directory.
    pub fn new_session(&self) -> Result<SessionWorkspace, PipelineError> {
        SessionWorkspace::create(&self.workspace_root, &self.audio_file)
    }

    /// Look up a session created earlier by this pipeline's workspace.
    pub fn open_session(&self, id: &str) -> Option<SessionWorkspace> {
        SessionWorkspace::open(&self.workspace_root, id, &self.audio_file)
    }

    /// Process an upload in a new session.
    ///
    /// On failure the session directory is removed, so a failed run leaves no
    /// artifacts behind.
    pub async fn run(
        &self,
        upload: &UploadedImage,
        sampling: SamplingParameters,
    ) -> Result<StoryOutcome, PipelineError> {
        let kind = self.validator.validate(upload)?;
        let session = self.new_session()?;

        let result = self.run_validated(&session, upload, kind, sampling).await;
        if result.is_err() {
            if let Err(e) = std::fs::remove_dir_all(session.dir()) {
                tracing::warn!("Failed to clean up session {}: {}", session.id(), e);
            }
        }
        result
    }

    /// Process an upload inside an existing session, overwriting its
    /// previous image and audio.
    ///
    /// A failed re-run clears the session, so an image is never left next to
    /// audio narrated for a different one.
    pub async fn run_in(
        &self,
        session: &SessionWorkspace,
        upload: &UploadedImage,
        sampling: SamplingParameters,
    ) -> Result<StoryOutcome, PipelineError> {
        let kind = self.validator.validate(upload)?;
        let result = self.run_validated(session, upload, kind, sampling).await;
        if result.is_err() {
            if let Err(e) = session.clear() {
                tracing::warn!("Failed to clear session {}: {}", session.id(), e);
            }
        }
        result
    }

    /// Read an image from disk and process it in a new session.
    pub async fn run_file(
        &self,
        path: &Path,
        sampling: SamplingParameters,
    ) -> Result<StoryOutcome, PipelineError> {
        let upload = UploadedImage::from_path(path)?;
        self.run(&upload, sampling).await
    }

    async fn run_validated(
        &self,
        session: &SessionWorkspace,
        upload: &UploadedImage,
        kind: ImageKind,
        sampling: SamplingParameters,
    ) -> Result<StoryOutcome, PipelineError> {
        let start = Instant::now();
        tracing::debug!("Session {}: processing {}", session.id(), upload.file_name);

        let image_path = session.write_image(upload, kind)?;

        // Caption
        let caption_start = Instant::now();
        let caption = bounded(
            "caption",
            self.limits.caption_timeout_ms,
            self.captioner.caption(&image_path),
        )
        .await?;
        let caption = caption.trim().to_string();
        if caption.is_empty() {
            return Err(PipelineError::Caption {
                path: image_path,
                message: "Captioner returned an empty caption".to_string(),
            });
        }
        let caption_ms = caption_start.elapsed().as_millis() as u64;
        tracing::info!("Caption: {caption}");

        // Story
        let story_start = Instant::now();
        let story = bounded(
            "story",
            self.limits.story_timeout_ms,
            self.story.generate(&caption, &sampling),
        )
        .await?;
        let story_ms = story_start.elapsed().as_millis() as u64;
        tracing::debug!("Story: {} words", story.split_whitespace().count());

        // Speech
        let speech_start = Instant::now();
        let audio = bounded(
            "speech",
            self.limits.speech_timeout_ms,
            self.speech.synthesize(&story, &session.audio_path()),
        )
        .await?;
        let speech_ms = speech_start.elapsed().as_millis() as u64;

        tracing::info!(
            "Session {} done in {:?} (caption {}ms, story {}ms, speech {}ms)",
            session.id(),
            start.elapsed(),
            caption_ms,
            story_ms,
            speech_ms
        );

        Ok(StoryOutcome {
            session_id: session.id(),
            image_path,
            caption,
            story,
            audio,
            sampling,
            timings: StageTimings {
                caption_ms,
                story_ms,
                speech_ms,
            },
        })
    }
}

/// Await a stage, failing with [`PipelineError::Timeout`] after `timeout_ms`.
async fn bounded<T, F>(stage: &str, timeout_ms: u64, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{stage} stage timed out after {timeout_ms}ms");
            Err(PipelineError::Timeout {
                stage: stage.to_string(),
                timeout_ms,
            })
        }
    }
}
