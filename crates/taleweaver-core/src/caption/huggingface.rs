//! Hosted captioning through the HuggingFace inference API.
//!
//! Sends the image base64-encoded in a JSON body together with the generation
//! cap, and reads back `[{"generated_text": "..."}]`.

use super::Captioner;
use crate::error::PipelineError;
use crate::types::ImageKind;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Captioner backed by a hosted image-to-text endpoint.
pub struct HuggingFaceCaptioner {
    endpoint: String,
    api_key: String,
    max_new_tokens: u32,
    client: reqwest::Client,
}

impl HuggingFaceCaptioner {
    pub fn new(endpoint: &str, api_key: &str, max_new_tokens: u32) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            max_new_tokens,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct CaptionRequest {
    inputs: String,
    parameters: CaptionParameters,
}

#[derive(Serialize)]
struct CaptionParameters {
    max_new_tokens: u32,
}

#[derive(Deserialize)]
struct CaptionCandidate {
    generated_text: String,
}

#[async_trait]
impl Captioner for HuggingFaceCaptioner {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn caption(&self, image_path: &Path) -> Result<String, PipelineError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| PipelineError::Caption {
                path: image_path.to_path_buf(),
                message: format!("Cannot read image: {e}"),
            })?;
        let mime = ImageKind::sniff(&bytes)
            .map(|k| k.mime_type())
            .unwrap_or("application/octet-stream");

        let body = CaptionRequest {
            inputs: base64::engine::general_purpose::STANDARD.encode(&bytes),
            parameters: CaptionParameters {
                max_new_tokens: self.max_new_tokens,
            },
        };

        tracing::debug!("Requesting caption for {:?} ({mime})", image_path);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Caption {
                path: image_path.to_path_buf(),
                message: format!("Caption request failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream {
                service: "caption".to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let candidates: Vec<CaptionCandidate> =
            resp.json()
                .await
                .map_err(|e| PipelineError::UnexpectedResponse {
                    service: "caption".to_string(),
                    message: format!("Failed to parse caption response: {e}"),
                })?;

        candidates
            .into_iter()
            .next()
            .map(|c| c.generated_text.trim().to_string())
            .ok_or_else(|| PipelineError::UnexpectedResponse {
                service: "caption".to_string(),
                message: "Caption response contained no candidates".to_string(),
            })
    }
}
