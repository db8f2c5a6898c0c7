use async_trait::async_trait;
use std::path::Path;

use super::{normalize_into_audio_dir, FetchContext, FetchedMedia, MediaInfo, MediaSource};
use crate::utils::{format_file_size, spinner};
use crate::{Result, TranscriberError};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac", "aac"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "avi", "mov"];

pub struct LocalFileExtractor;

impl LocalFileExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Check if the file exists, is readable and has a supported extension
    async fn validate_file(&self, path: &Path) -> Result<u64> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| TranscriberError::fs(path, e))?;

        if !metadata.is_file() {
            return Err(TranscriberError::InvalidInput(format!("Path is not a file: {}", path.display())));
        }

        if metadata.len() == 0 {
            return Err(TranscriberError::InvalidInput(format!("File is empty: {}", path.display())));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        if !is_supported_extension(&extension) {
            return Err(TranscriberError::InvalidInput(format!(
                "Unsupported format: .{} (supported: {}, {})",
                extension,
                AUDIO_EXTENSIONS.join(", "),
                VIDEO_EXTENSIONS.join(", ")
            )));
        }

        Ok(metadata.len())
    }
}

fn is_supported_extension(extension: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&extension) || VIDEO_EXTENSIONS.contains(&extension)
}

#[async_trait]
impl MediaSource for LocalFileExtractor {
    fn supports(&self, input: &str) -> bool {
        !input.starts_with("http://") && !input.starts_with("https://") && Path::new(input).exists()
    }

    fn platform_name(&self) -> &'static str {
        "Local File"
    }

    async fn fetch(&self, input: &str, ctx: &FetchContext) -> Result<FetchedMedia> {
        let path = Path::new(input);
        let absolute = fs_err::canonicalize(path).map_err(|e| TranscriberError::fs(path, e))?;

        let size = self.validate_file(&absolute).await?;
        tracing::info!(file = %absolute.display(), size = %format_file_size(size), "Reading local file");

        let progress = spinner("Converting to MP3...", ctx.quiet);
        let audio = normalize_into_audio_dir(ctx, &absolute, "local").await?;
        progress.finish_with_message("Conversion complete");

        let title = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Local file".to_string());

        Ok(FetchedMedia {
            audio,
            info: MediaInfo {
                title,
                author: Some("Local file".to_string()),
                duration_seconds: None,
                source: absolute.display().to_string(),
            },
            video_path: None,
        })
    }
}

impl Default for LocalFileExtractor {
    fn default() -> Self {
        Self::new()
    }
}
