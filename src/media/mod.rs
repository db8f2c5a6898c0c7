use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod ffmpeg;

pub use ffmpeg::Ffmpeg;

use crate::transcribe::planner::Segment;
use crate::{Result, TranscriberError};

/// An audio file on local disk
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Filled in on first request via [`AudioArtifact::duration`]
    pub duration_seconds: Option<f64>,
}

impl AudioArtifact {
    /// Stat the file and wrap it
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs_err::metadata(&path).map_err(|e| TranscriberError::fs(&path, e))?;

        if !metadata.is_file() {
            return Err(TranscriberError::InvalidInput(format!("Path is not a file: {}", path.display())));
        }

        Ok(Self {
            path,
            size_bytes: metadata.len(),
            duration_seconds: None,
        })
    }

    /// Total duration in seconds, probed once and cached
    pub async fn duration(&mut self, toolkit: &dyn MediaToolkit) -> Result<f64> {
        if let Some(duration) = self.duration_seconds {
            return Ok(duration);
        }

        let duration = toolkit.probe_duration(&self.path).await?;
        self.duration_seconds = Some(duration);
        Ok(duration)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.mp3".to_string())
    }

    /// File name without extension
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string())
    }
}

/// Owns a file on disk and deletes it when dropped, unless [`TempArtifact::keep`] is called.
///
/// Removal failures are logged and never surfaced, so they cannot mask the error that caused
/// an early exit.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    armed: bool,
}

impl TempArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand the path back to the caller
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temporary file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temporary file"),
        }
    }
}

/// Media toolkit operations the pipeline relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Duration of an audio file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Carve `segment` out of `source` into a standalone file at `target`
    async fn extract_segment(&self, source: &Path, target: &Path, segment: &Segment) -> Result<()>;

    /// Convert any audio/video file into mono 16 kHz MP3 at `target`
    async fn normalize(&self, source: &Path, target: &Path) -> Result<()>;
}
