//! HTTP routes.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use taleweaver_core::{
    ImageKind, SamplingParameters, StageTimings, StoryOutcome, UploadedImage, VERSION,
};
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::page;
use super::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/story", post(story_page))
        .route("/api/story", post(story_api))
        .route("/sessions/{id}/audio", get(audio))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(state.body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::index_page(&state.defaults))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

/// A parsed story request.
struct StoryForm {
    upload: UploadedImage,
    sampling: SamplingParameters,
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    defaults: SamplingParameters,
) -> Result<StoryForm, ApiError> {
    let mut multipart = multipart
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {e}")))?;

    let mut upload = None;
    let mut top_k = defaults.top_k as i64;
    let mut top_p = defaults.top_p;
    let mut temperature = defaults.temperature;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed reading multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .or_else(|| field.content_type().and_then(name_for_mime));
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed reading multipart 'image' field: {e}"))
                })?;
                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() {
                    continue;
                }
                let file_name = file_name.unwrap_or_else(|| "upload".to_string());
                upload = Some(UploadedImage::new(bytes.to_vec(), &file_name)?);
            }
            "top_k" => top_k = parse_field(&name, field.text().await)?,
            "top_p" => top_p = parse_field(&name, field.text().await)?,
            "temperature" => temperature = parse_field(&name, field.text().await)?,
            _ => tracing::debug!("Ignoring multipart field '{name}'"),
        }
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("Please upload a JPG or PNG image."))?;
    Ok(StoryForm {
        upload,
        sampling: SamplingParameters::clamped(top_k, top_p, temperature),
    })
}

fn name_for_mime(mime: &str) -> Option<String> {
    match mime {
        "image/jpeg" => Some(format!("upload.{}", ImageKind::Jpeg.extension())),
        "image/png" => Some(format!("upload.{}", ImageKind::Png.extension())),
        _ => None,
    }
}

fn parse_field<T: std::str::FromStr>(
    name: &str,
    text: Result<String, axum::extract::multipart::MultipartError>,
) -> Result<T, ApiError> {
    let text = text.map_err(|e| {
        ApiError::bad_request(format!("Failed reading multipart '{name}' field: {e}"))
    })?;
    text.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("'{name}' must be a number, got '{text}'")))
}

fn audio_url(session_id: &str) -> String {
    format!("/sessions/{session_id}/audio")
}

async fn story_page(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Html<String>, ApiError> {
    let defaults = state.defaults;
    let form = read_form(multipart, defaults)
        .await
        .map_err(|e| e.with_defaults(defaults))?;
    let outcome = state
        .pipeline
        .run(&form.upload, form.sampling)
        .await
        .map_err(|e| ApiError::from(e).with_defaults(defaults))?;
    Ok(Html(page::result_page(
        &outcome,
        &form.upload,
        &audio_url(&outcome.session_id),
    )))
}

/// JSON body of `POST /api/story`.
#[derive(Debug, Serialize)]
struct StoryResponse {
    session_id: String,
    caption: String,
    story: String,
    audio_url: String,
    audio_bytes: u64,
    sampling: SamplingParameters,
    timings: StageTimings,
}

impl From<StoryOutcome> for StoryResponse {
    fn from(outcome: StoryOutcome) -> Self {
        Self {
            audio_url: audio_url(&outcome.session_id),
            audio_bytes: outcome.audio.bytes_written,
            session_id: outcome.session_id,
            caption: outcome.caption,
            story: outcome.story,
            sampling: outcome.sampling,
            timings: outcome.timings,
        }
    }
}

async fn story_api(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StoryResponse>, ApiError> {
    let form = read_form(multipart, state.defaults)
        .await
        .map_err(ApiError::json)?;
    let outcome = state
        .pipeline
        .run(&form.upload, form.sampling)
        .await
        .map_err(|e| ApiError::from(e).json())?;
    Ok(Json(outcome.into()))
}

/// Content type guessed from the leading bytes of the audio file.
fn audio_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"fLaC") {
        "audio/flac"
    } else if bytes.starts_with(b"RIFF") {
        "audio/wav"
    } else if bytes.starts_with(b"OggS") {
        "audio/ogg"
    } else {
        "audio/mpeg"
    }
}

async fn audio(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let session = state
        .pipeline
        .open_session(&id)
        .ok_or_else(|| ApiError::not_found("No such session").with_defaults(state.defaults))?;

    let path = session.audio_path();
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("This session has no audio").with_defaults(state.defaults));
        }
        Err(e) => {
            tracing::error!("Cannot read {:?}: {e}", path);
            return Err(ApiError::internal("Cannot read audio file").with_defaults(state.defaults));
        }
    };

    Ok(([(header::CONTENT_TYPE, audio_content_type(&bytes))], bytes).into_response())
}
