//! Upload validation before anything touches disk.

use std::path::PathBuf;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::{ImageKind, UploadedImage};

/// Validates uploads before processing.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check size and magic bytes of an upload.
    ///
    /// Returns the kind detected from the content, which wins over the
    /// declared extension when the two disagree (a PNG saved as `.jpg`).
    pub fn validate(&self, upload: &UploadedImage) -> Result<ImageKind, PipelineError> {
        let path = PathBuf::from(&upload.file_name);

        let max_bytes = self.limits.max_upload_mb.saturating_mul(1024 * 1024);
        let size = upload.bytes.len() as u64;
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path,
                size_mb: size / (1024 * 1024),
                max_mb: self.limits.max_upload_mb,
            });
        }

        if upload.bytes.len() < 4 {
            return Err(PipelineError::InvalidImage {
                path,
                message: "File too small to be a valid image".to_string(),
            });
        }

        let detected = ImageKind::sniff(&upload.bytes).ok_or_else(|| {
            PipelineError::InvalidImage {
                path: path.clone(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            }
        })?;

        if detected != upload.kind {
            tracing::debug!(
                "{} declared as {:?} but content is {:?}",
                upload.file_name,
                upload.kind,
                detected
            );
        }

        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: [u8; 8] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F'];
    const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn validator(max_upload_mb: u64) -> Validator {
        Validator::new(LimitsConfig {
            max_upload_mb,
            ..LimitsConfig::default()
        })
    }

    #[test]
    fn test_valid_jpeg() {
        let upload = UploadedImage::new(JPEG.to_vec(), "dog.jpg").unwrap();
        assert_eq!(validator(1).validate(&upload).unwrap(), ImageKind::Jpeg);
    }

    #[test]
    fn test_content_wins_over_extension() {
        let upload = UploadedImage::new(PNG.to_vec(), "dog.jpeg").unwrap();
        assert_eq!(validator(1).validate(&upload).unwrap(), ImageKind::Png);
    }

    #[test]
    fn test_rejects_unknown_magic() {
        let upload = UploadedImage::new(b"GIF89a....".to_vec(), "dog.png").unwrap();
        let err = validator(1).validate(&upload).unwrap_err();
        assert!(err.to_string().contains("invalid magic bytes"));
    }

    #[test]
    fn test_rejects_tiny_file() {
        let upload = UploadedImage::new(vec![0xFF, 0xD8], "dog.jpg").unwrap();
        let err = validator(1).validate(&upload).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let mut bytes = JPEG.to_vec();
        bytes.resize(1024 * 1024 + 1, 0);
        let upload = UploadedImage::new(bytes, "big.jpg").unwrap();
        let err = validator(1).validate(&upload).unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }

    #[test]
    fn test_unbounded_limit_does_not_overflow() {
        let upload = UploadedImage::new(JPEG.to_vec(), "dog.jpg").unwrap();
        assert_eq!(validator(u64::MAX).validate(&upload).unwrap(), ImageKind::Jpeg);
    }
}
