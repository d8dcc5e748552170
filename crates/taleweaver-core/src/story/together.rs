//! Together AI story generator using the `/inference` chat endpoint.
//!
//! Request and response bodies are typed, so a response missing
//! `output.choices[0].text` surfaces as an error instead of a panic.

use super::prompt::{story_prompt, ChatMessage};
use super::StoryGenerator;
use crate::error::PipelineError;
use crate::types::SamplingParameters;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Story generator talking to a Together-style inference endpoint.
pub struct TogetherStoryGenerator {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl TogetherStoryGenerator {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct InferenceRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    top_k: u32,
    top_p: f32,
    temperature: f32,
}

// --- Response types ---

#[derive(Deserialize)]
struct InferenceResponse {
    output: InferenceOutput,
}

#[derive(Deserialize)]
struct InferenceOutput {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    text: String,
}

#[async_trait]
impl StoryGenerator for TogetherStoryGenerator {
    fn name(&self) -> &str {
        "together"
    }

    async fn generate(
        &self,
        caption: &str,
        sampling: &SamplingParameters,
    ) -> Result<String, PipelineError> {
        let start = Instant::now();

        let body = InferenceRequest {
            model: &self.model,
            messages: story_prompt(caption, sampling.temperature),
            top_k: sampling.top_k,
            top_p: sampling.top_p,
            temperature: sampling.temperature,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Story {
                message: format!("Request to {} failed: {e}", self.endpoint),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Upstream {
                service: "story".to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: InferenceResponse =
            resp.json()
                .await
                .map_err(|e| PipelineError::UnexpectedResponse {
                    service: "story".to_string(),
                    message: format!("Failed to parse inference response: {e}"),
                })?;

        let text = parsed
            .output
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| PipelineError::UnexpectedResponse {
                service: "story".to_string(),
                message: "output.choices is empty".to_string(),
            })?;

        tracing::debug!(
            "Story generated by {} in {}ms ({} words)",
            self.model,
            start.elapsed().as_millis(),
            text.split_whitespace().count()
        );

        Ok(text.trim().to_string())
    }
}
