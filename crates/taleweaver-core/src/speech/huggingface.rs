//! Text-to-speech through the HuggingFace inference API.

use super::SpeechSynthesizer;
use crate::error::PipelineError;
use crate::types::AudioArtifact;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Speech synthesizer posting `{"inputs": text}` and saving the raw reply.
pub struct HuggingFaceSpeech {
    endpoint: String,
    api_key: String,
    check_status: bool,
    client: reqwest::Client,
}

impl HuggingFaceSpeech {
    /// `check_status = false` writes the body to disk whatever the HTTP status.
    pub fn new(endpoint: &str, api_key: &str, check_status: bool) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            check_status,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    inputs: &'a str,
}

#[async_trait]
impl SpeechSynthesizer for HuggingFaceSpeech {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn synthesize(&self, text: &str, dest: &Path) -> Result<AudioArtifact, PipelineError> {
        tracing::debug!("Synthesizing {} characters of speech", text.len());

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SpeechRequest { inputs: text })
            .send()
            .await
            .map_err(|e| PipelineError::Speech {
                message: format!("Request to {} failed: {e}", self.endpoint),
            })?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if !status.is_success() {
            if self.check_status {
                let body = resp.text().await.unwrap_or_default();
                return Err(PipelineError::Upstream {
                    service: "speech".to_string(),
                    status: status.as_u16(),
                    body,
                });
            }
            tracing::warn!(
                "Speech endpoint returned HTTP {status}; writing the response body anyway"
            );
        }

        let bytes = resp.bytes().await.map_err(|e| PipelineError::Speech {
            message: format!("Failed to read speech response: {e}"),
        })?;

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| PipelineError::Write {
                path: dest.to_path_buf(),
                source,
            })?;

        Ok(AudioArtifact {
            path: dest.to_path_buf(),
            bytes_written: bytes.len() as u64,
            content_type,
        })
    }
}
