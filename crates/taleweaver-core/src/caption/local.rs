//! Captioner running BLIP locally.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::blip::BlipModel;
use super::preprocess::preprocess;
use super::Captioner;
use crate::error::PipelineError;

/// Local BLIP captioner. Cheap to clone; the loaded model is shared.
#[derive(Clone)]
pub struct LocalCaptioner {
    model: Arc<BlipModel>,
    image_size: u32,
    max_new_tokens: u32,
}

impl LocalCaptioner {
    pub fn new(model: BlipModel, image_size: u32, max_new_tokens: u32) -> Self {
        Self {
            model: Arc::new(model),
            image_size,
            max_new_tokens,
        }
    }
}

#[async_trait]
impl Captioner for LocalCaptioner {
    fn name(&self) -> &str {
        "local"
    }

    async fn caption(&self, image_path: &Path) -> Result<String, PipelineError> {
        let model = Arc::clone(&self.model);
        let path = image_path.to_path_buf();
        let image_size = self.image_size;
        let max_new_tokens = self.max_new_tokens;

        // Decode and inference are CPU-bound.
        tokio::task::spawn_blocking(move || {
            let image = image::open(&path).map_err(|e| PipelineError::Caption {
                path: path.clone(),
                message: format!("Cannot decode image: {e}"),
            })?;
            let tensor = preprocess(&image, image_size);
            model.caption(&tensor, max_new_tokens, &path)
        })
        .await
        .map_err(|e| PipelineError::Caption {
            path: image_path.to_path_buf(),
            message: format!("Task join error: {e}"),
        })?
    }
}
