//! Web error handling.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;
use taleweaver_core::{PipelineError, SamplingParameters};

use super::page;

/// How an error is rendered to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Full HTML page for the browser UI
    Html,
    /// `{"error": {...}}` for API clients
    Json,
}

/// Error returned by a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub render: Render,
    /// Slider values for the HTML error page
    pub defaults: SamplingParameters,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            render: Render::Html,
            defaults: SamplingParameters::default(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
            render: Render::Html,
            defaults: SamplingParameters::default(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
            render: Render::Html,
            defaults: SamplingParameters::default(),
        }
    }

    /// Prefill the error page form with the configured sampling defaults.
    pub fn with_defaults(self, defaults: SamplingParameters) -> Self {
        Self { defaults, ..self }
    }

    /// Render this error as JSON instead of HTML.
    pub fn json(self) -> Self {
        Self {
            render: Render::Json,
            ..self
        }
    }
}

/// HTTP status for a pipeline failure.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_bad_input() => StatusCode::BAD_REQUEST,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!("Story request failed: {err}");
        } else {
            tracing::debug!("Story request rejected: {err}");
        }
        Self {
            status,
            message: err.to_string(),
            render: Render::Html,
            defaults: SamplingParameters::default(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.render {
            Render::Html => {
                let body = page::error_page(self.status.as_u16(), &self.message, &self.defaults);
                (self.status, Html(body)).into_response()
            }
            Render::Json => {
                let body = Json(json!({
                    "error": {
                        "message": self.message,
                        "type": match self.status {
                            StatusCode::BAD_REQUEST => "invalid_request_error",
                            StatusCode::NOT_FOUND => "not_found_error",
                            StatusCode::BAD_GATEWAY => "upstream_error",
                            StatusCode::GATEWAY_TIMEOUT => "timeout_error",
                            _ => "server_error",
                        },
                        "code": self.status.as_u16(),
                    }
                }));
                (self.status, body).into_response()
            }
        }
    }
}
