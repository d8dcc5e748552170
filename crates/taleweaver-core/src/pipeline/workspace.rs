//! Per-request session directories.
//!
//! Each run writes its upload and its audio into `{root}/{uuid}/`, so two
//! concurrent requests never touch the same file. Re-running inside the same
//! session overwrites the two artifacts in place.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::PipelineError;
use crate::types::{ImageKind, UploadedImage};

/// Base name of the persisted upload; the extension follows the image kind.
const IMAGE_STEM: &str = "uploaded_image";

/// A directory owned by one request.
#[derive(Debug, Clone)]
pub struct SessionWorkspace {
    id: Uuid,
    dir: PathBuf,
    audio_file: String,
}

impl SessionWorkspace {
    /// Create a fresh session directory under `root`.
    pub fn create(root: &Path, audio_file: &str) -> Result<Self, PipelineError> {
        let id = Uuid::new_v4();
        let dir = root.join(id.to_string());
        std::fs::create_dir_all(&dir).map_err(|source| PipelineError::Write {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!("Created session {id} at {:?}", dir);
        Ok(Self {
            id,
            dir,
            audio_file: audio_file.to_string(),
        })
    }

    /// Reopen an existing session by id.
    ///
    /// Returns `None` for ids that are not UUIDs (no path traversal through
    /// the id) or whose directory does not exist.
    pub fn open(root: &Path, id: &str, audio_file: &str) -> Option<Self> {
        let id = Uuid::parse_str(id).ok()?;
        let dir = root.join(id.to_string());
        dir.is_dir().then(|| Self {
            id,
            dir,
            audio_file: audio_file.to_string(),
        })
    }

    /// Session identifier.
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    /// Session directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where an upload of the given kind is stored.
    pub fn image_path(&self, kind: ImageKind) -> PathBuf {
        self.dir.join(format!("{IMAGE_STEM}.{}", kind.extension()))
    }

    /// Where the synthesized audio is stored.
    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(&self.audio_file)
    }

    /// Persist the upload, replacing any earlier upload of this session.
    pub fn write_image(
        &self,
        upload: &UploadedImage,
        kind: ImageKind,
    ) -> Result<PathBuf, PipelineError> {
        for other in [ImageKind::Jpeg, ImageKind::Png] {
            if other != kind {
                remove_if_present(self.image_path(other))?;
            }
        }

        let path = self.image_path(kind);
        std::fs::write(&path, &upload.bytes).map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Remove the upload and the audio, keeping the directory itself.
    pub fn clear(&self) -> Result<(), PipelineError> {
        remove_if_present(self.image_path(ImageKind::Jpeg))?;
        remove_if_present(self.image_path(ImageKind::Png))?;
        remove_if_present(self.audio_path())
    }
}

fn remove_if_present(path: PathBuf) -> Result<(), PipelineError> {
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Write { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(bytes: &[u8], name: &str) -> UploadedImage {
        UploadedImage::new(bytes.to_vec(), name).unwrap()
    }

    #[test]
    fn test_sessions_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let a = SessionWorkspace::create(root.path(), "audio_story.mp3").unwrap();
        let b = SessionWorkspace::create(root.path(), "audio_story.mp3").unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.audio_path(), b.audio_path());
        assert!(a.dir().is_dir());
        assert!(b.dir().is_dir());
    }

    #[test]
    fn test_paths_inside_session() {
        let root = tempfile::tempdir().unwrap();
        let s = SessionWorkspace::create(root.path(), "audio_story.mp3").unwrap();
        assert_eq!(s.audio_path(), s.dir().join("audio_story.mp3"));
        assert_eq!(s.image_path(ImageKind::Jpeg), s.dir().join("uploaded_image.jpg"));
        assert_eq!(s.image_path(ImageKind::Png), s.dir().join("uploaded_image.png"));
    }

    #[test]
    fn test_rewrite_replaces_previous_upload() {
        let root = tempfile::tempdir().unwrap();
        let s = SessionWorkspace::create(root.path(), "a.mp3").unwrap();

        s.write_image(&upload(&[1, 2, 3], "x.jpg"), ImageKind::Jpeg).unwrap();
        let path = s.write_image(&upload(&[4, 5], "x.png"), ImageKind::Png).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![4, 5]);
        assert!(!s.image_path(ImageKind::Jpeg).exists());
        assert_eq!(std::fs::read_dir(s.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_clear_removes_artifacts_only() {
        let root = tempfile::tempdir().unwrap();
        let s = SessionWorkspace::create(root.path(), "a.mp3").unwrap();
        s.write_image(&upload(&[1, 2, 3], "x.jpg"), ImageKind::Jpeg).unwrap();
        std::fs::write(s.audio_path(), b"audio").unwrap();

        s.clear().unwrap();
        assert!(s.dir().is_dir());
        assert_eq!(std::fs::read_dir(s.dir()).unwrap().count(), 0);

        // Nothing left to remove is fine.
        s.clear().unwrap();
    }

    #[test]
    fn test_open_existing_session() {
        let root = tempfile::tempdir().unwrap();
        let s = SessionWorkspace::create(root.path(), "a.mp3").unwrap();
        let reopened = SessionWorkspace::open(root.path(), &s.id(), "a.mp3").unwrap();
        assert_eq!(reopened.dir(), s.dir());
    }

    #[test]
    fn test_open_rejects_bad_ids() {
        let root = tempfile::tempdir().unwrap();
        assert!(SessionWorkspace::open(root.path(), "../etc", "a.mp3").is_none());
        assert!(SessionWorkspace::open(root.path(), "not-a-uuid", "a.mp3").is_none());
        let unknown = Uuid::new_v4().to_string();
        assert!(SessionWorkspace::open(root.path(), &unknown, "a.mp3").is_none());
    }
}
