use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod direct;
pub mod local;
pub mod youtube;

use crate::config::Config;
use crate::media::{MediaToolkit, TempArtifact};
use crate::{Result, TranscriberError};

/// Descriptive metadata written into the transcript header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Title or file name of the media
    pub title: String,

    /// Channel, uploader or host
    pub author: Option<String>,

    /// Duration in seconds if known up front
    pub duration_seconds: Option<f64>,

    /// URL or absolute path the media came from
    pub source: String,
}

/// Normalized audio ready for transcription, plus what we learned fetching it
#[derive(Debug)]
pub struct FetchedMedia {
    /// Mono 16 kHz MP3, deleted on drop unless kept
    pub audio: TempArtifact,

    pub info: MediaInfo,

    /// Video kept on disk (YouTube with `KEEP_VIDEO` only)
    pub video_path: Option<PathBuf>,
}

/// What a source needs from the rest of the application
#[derive(Clone)]
pub struct FetchContext {
    pub config: Arc<Config>,
    pub toolkit: Arc<dyn MediaToolkit>,
    pub quiet: bool,
}

/// A place media can come from
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Check if this source handles the given input
    fn supports(&self, input: &str) -> bool;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;

    /// Fetch the media and produce normalized audio in the audio directory
    async fn fetch(&self, input: &str, ctx: &FetchContext) -> Result<FetchedMedia>;
}

/// Registry for managing multiple sources. The first source that supports an input wins.
pub struct ExtractorRegistry {
    sources: Vec<Box<dyn MediaSource>>,
}

impl ExtractorRegistry {
    /// Create a new registry with default sources: YouTube, direct URL, local file
    pub fn new(request_timeout: std::time::Duration) -> Result<Self> {
        let mut registry = Self::empty();

        registry.register(Box::new(youtube::YoutubeExtractor::new()));
        registry.register(Box::new(direct::DirectExtractor::new(request_timeout)?));
        registry.register(Box::new(local::LocalFileExtractor::new()));

        Ok(registry)
    }

    pub fn empty() -> Self {
        Self { sources: Vec::new() }
    }

    /// Register a new source
    pub fn register(&mut self, source: Box<dyn MediaSource>) {
        self.sources.push(source);
    }

    /// Find a source that supports the given input
    pub fn find(&self, input: &str) -> Option<&dyn MediaSource> {
        self.sources
            .iter()
            .find(|source| source.supports(input))
            .map(|boxed| boxed.as_ref())
    }

    /// List all supported platforms
    pub fn list_platforms(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.platform_name()).collect()
    }

    /// Fetch using the appropriate source
    pub async fn fetch(&self, input: &str, ctx: &FetchContext) -> Result<FetchedMedia> {
        let source = self.find(input).ok_or_else(|| {
            TranscriberError::InvalidInput(format!(
                "'{}' is not a YouTube link, a direct media URL or an existing file",
                input
            ))
        })?;

        tracing::info!(platform = source.platform_name(), "Fetching media from {}", input);
        source.fetch(input, ctx).await
    }
}

/// Add a human hint to well-known downloader failures
pub fn translate_fetch_error(message: &str) -> String {
    let lower = message.to_lowercase();

    let hint = if lower.contains("not available") {
        Some("Video unavailable. It may be private, removed or geo-blocked.")
    } else if lower.contains("private") {
        Some("Private video. It cannot be downloaded.")
    } else if lower.contains("confirm your age") || lower.contains("age-restricted") || lower.contains("age restricted") {
        Some("Age-restricted video. Try signing in to YouTube in a browser.")
    } else {
        None
    };

    match hint {
        Some(hint) => format!("{} ({})", hint, message.trim()),
        None => message.trim().to_string(),
    }
}

/// Unique path for a new normalized audio file
pub fn unique_audio_path(audio_dir: &Path, stem: &str) -> PathBuf {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let random_suffix = uuid::Uuid::new_v4().simple().to_string();

    audio_dir.join(format!("{}_{}_{}.mp3", stem, timestamp, &random_suffix[..8]))
}

/// Scratch directory for raw downloads, removed when dropped
pub(crate) fn scratch_dir(audio_dir: &Path) -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix("download_")
        .tempdir_in(audio_dir)
        .map_err(|e| TranscriberError::fs(audio_dir, e))
}

/// Normalize `source` into a fresh guarded file in the audio directory
pub(crate) async fn normalize_into_audio_dir(ctx: &FetchContext, source: &Path, stem: &str) -> Result<TempArtifact> {
    let audio = TempArtifact::new(unique_audio_path(&ctx.config.paths.audio_dir, stem));

    ctx.toolkit.normalize(source, audio.path()).await?;

    Ok(audio)
}
