//! Shared server state.

use std::sync::Arc;

use taleweaver_core::{Config, SamplingParameters, StoryPipeline};

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StoryPipeline>,
    /// Slider defaults and fallback for omitted form fields
    pub defaults: SamplingParameters,
    /// Request body cap in bytes
    pub body_limit: usize,
}

impl AppState {
    pub fn new(pipeline: StoryPipeline, config: &Config) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            defaults: SamplingParameters::clamped(
                config.story.top_k as i64,
                config.story.top_p,
                config.story.temperature,
            ),
            // Multipart framing and the sampling fields ride on top of the image.
            body_limit: usize::try_from(config.limits.max_upload_mb)
                .unwrap_or(usize::MAX)
                .saturating_mul(1024 * 1024)
                .saturating_add(64 * 1024),
        }
    }
}
