//! Core data types flowing through the Taleweaver pipeline.
//!
//! Every value here lives for a single request: an upload goes in, a
//! [`StoryOutcome`] comes out, nothing is shared between requests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::PipelineError;

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Map a declared file extension (jpg, jpeg, png; any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    /// Detect the kind from the leading bytes of the file.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 3 && bytes[..3] == [0xFF, 0xD8, 0xFF] {
            return Some(ImageKind::Jpeg);
        }
        if bytes.len() >= 4 && bytes[..4] == [0x89, b'P', b'N', b'G'] {
            return Some(ImageKind::Png);
        }
        None
    }

    /// File extension used when persisting the upload.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }

    /// MIME type for HTTP payloads and data URLs.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }
}

/// A user-supplied image, held in memory until it is written to the session.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Raw file bytes
    pub bytes: Vec<u8>,
    /// Declared format
    pub kind: ImageKind,
    /// Original file name, for logging and error messages
    pub file_name: String,
}

impl UploadedImage {
    /// Build an upload from its bytes and the name the user gave it.
    ///
    /// The format comes from the file extension; only jpg, jpeg and png are accepted.
    pub fn new(bytes: Vec<u8>, file_name: &str) -> Result<Self, PipelineError> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let kind = ImageKind::from_extension(ext).ok_or_else(|| {
            PipelineError::UnsupportedFormat {
                path: PathBuf::from(file_name),
                format: if ext.is_empty() {
                    "unknown".to_string()
                } else {
                    ext.to_string()
                },
            }
        })?;
        Ok(Self {
            bytes,
            kind,
            file_name: file_name.to_string(),
        })
    }

    /// Read an upload from a file on disk.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        // Check the extension before reading a potentially large file.
        let probe = Self::new(Vec::new(), name)?;
        let bytes = std::fs::read(path).map_err(|e| PipelineError::InvalidImage {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {e}"),
        })?;
        Ok(Self { bytes, ..probe })
    }
}

/// Out-of-range sampling parameter.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{name} must be within {min}..={max}, got {value}")]
pub struct SamplingError {
    pub name: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// Numeric knobs forwarded verbatim to the story model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParameters {
    /// Top-K, 1..=100
    pub top_k: u32,
    /// Top-P, 0.0..=1.0
    pub top_p: f32,
    /// Temperature, 0.1..=2.0
    pub temperature: f32,
}

impl SamplingParameters {
    pub const TOP_K_RANGE: (u32, u32) = (1, 100);
    pub const TOP_P_RANGE: (f32, f32) = (0.0, 1.0);
    pub const TEMPERATURE_RANGE: (f32, f32) = (0.1, 2.0);

    /// Construct, rejecting values outside the documented bounds.
    pub fn new(top_k: u32, top_p: f32, temperature: f32) -> Result<Self, SamplingError> {
        check("top_k", top_k as f64, Self::TOP_K_RANGE.0 as f64, Self::TOP_K_RANGE.1 as f64)?;
        check("top_p", top_p as f64, Self::TOP_P_RANGE.0 as f64, Self::TOP_P_RANGE.1 as f64)?;
        check(
            "temperature",
            temperature as f64,
            Self::TEMPERATURE_RANGE.0 as f64,
            Self::TEMPERATURE_RANGE.1 as f64,
        )?;
        Ok(Self {
            top_k,
            top_p,
            temperature,
        })
    }

    /// Construct by clamping each value into its bounds, like a bounded number widget.
    ///
    /// NaN falls back to the lower bound.
    pub fn clamped(top_k: i64, top_p: f32, temperature: f32) -> Self {
        let (k_min, k_max) = Self::TOP_K_RANGE;
        Self {
            top_k: top_k.clamp(k_min as i64, k_max as i64) as u32,
            top_p: clamp_f32(top_p, Self::TOP_P_RANGE),
            temperature: clamp_f32(temperature, Self::TEMPERATURE_RANGE),
        }
    }
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            top_k: 5,
            top_p: 0.8,
            temperature: 1.5,
        }
    }
}

fn check(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), SamplingError> {
    // Written so NaN fails the check.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(SamplingError {
            name,
            value,
            min,
            max,
        })
    }
}

fn clamp_f32(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// Synthesized speech written to a session directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioArtifact {
    /// Where the audio bytes were written
    pub path: PathBuf,
    /// Number of bytes written
    pub bytes_written: u64,
    /// Content-Type reported by the speech endpoint, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub caption_ms: u64,
    pub story_ms: u64,
    pub speech_ms: u64,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryOutcome {
    /// Session the artifacts belong to
    pub session_id: String,
    /// Path of the persisted upload
    pub image_path: PathBuf,
    /// Caption of the uploaded image
    pub caption: String,
    /// Generated story (title and body)
    pub story: String,
    /// The audio rendition of the story
    pub audio: AudioArtifact,
    /// Parameters the story was generated with
    pub sampling: SamplingParameters,
    /// Per-stage durations
    pub timings: StageTimings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_kind_from_extension() {
        assert_eq!(ImageKind::from_extension("jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("JPEG"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_extension("png"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_extension("gif"), None);
        assert_eq!(ImageKind::from_extension(""), None);
    }

    #[test]
    fn test_image_kind_sniff() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(
            ImageKind::sniff(&[0x89, b'P', b'N', b'G', 0x0D]),
            Some(ImageKind::Png)
        );
        assert_eq!(ImageKind::sniff(b"GIF89a"), None);
        assert_eq!(ImageKind::sniff(&[0xFF]), None);
    }

    #[test]
    fn test_uploaded_image_rejects_unknown_extension() {
        let err = UploadedImage::new(vec![1, 2, 3], "cat.webp").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { ref format, .. } if format == "webp"));

        let err = UploadedImage::new(vec![1, 2, 3], "noext").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { ref format, .. } if format == "unknown"));
    }

    #[test]
    fn test_uploaded_image_from_missing_path() {
        let err = UploadedImage::from_path(Path::new("/nonexistent/dog.jpg")).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_uploaded_image_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Dog.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        let upload = UploadedImage::from_path(&path).unwrap();
        assert_eq!(upload.kind, ImageKind::Png);
        assert_eq!(upload.bytes.len(), 4);
        assert_eq!(upload.file_name, "Dog.PNG");
    }

    #[test]
    fn test_sampling_bounds() {
        assert!(SamplingParameters::new(1, 0.0, 0.1).is_ok());
        assert!(SamplingParameters::new(100, 1.0, 2.0).is_ok());

        let err = SamplingParameters::new(101, 0.5, 1.0).unwrap_err();
        assert_eq!(err.name, "top_k");
        let err = SamplingParameters::new(5, 1.1, 1.0).unwrap_err();
        assert_eq!(err.name, "top_p");
        let err = SamplingParameters::new(5, 0.5, 0.05).unwrap_err();
        assert_eq!(err.name, "temperature");
        let err = SamplingParameters::new(5, f32::NAN, 1.0).unwrap_err();
        assert_eq!(err.name, "top_p");
    }

    #[test]
    fn test_sampling_clamped() {
        let params = SamplingParameters::clamped(0, 1.7, 9.0);
        assert_eq!(params.top_k, 1);
        assert_eq!(params.top_p, 1.0);
        assert_eq!(params.temperature, 2.0);

        let params = SamplingParameters::clamped(500, -0.3, f32::NAN);
        assert_eq!(params.top_k, 100);
        assert_eq!(params.top_p, 0.0);
        assert_eq!(params.temperature, 0.1);

        // In-range values pass through untouched.
        let params = SamplingParameters::clamped(42, 0.37, 0.9);
        assert_eq!(params, SamplingParameters::new(42, 0.37, 0.9).unwrap());
    }

    #[test]
    fn test_sampling_defaults_are_in_range() {
        let d = SamplingParameters::default();
        assert_eq!(SamplingParameters::new(d.top_k, d.top_p, d.temperature).unwrap(), d);
    }
}
