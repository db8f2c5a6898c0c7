use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::{normalize_into_audio_dir, scratch_dir, FetchContext, FetchedMedia, MediaInfo, MediaSource};
use crate::utils::{extract_domain, format_file_size, progress_bar};
use crate::{Result, TranscriberError};

/// Extensions accepted on direct media links
const MEDIA_EXTENSIONS: &[&str] = &["mp3", "mp4", "wav", "ogg", "webm", "m4a", "flac", "aac", "mpeg"];

/// Direct URL extractor for audio and video files
pub struct DirectExtractor {
    client: Client,
    timeout: Duration,
}

impl DirectExtractor {
    /// `idle_timeout` bounds connecting, waiting for headers and each gap between body chunks.
    /// A large file that keeps arriving is never cut off.
    pub fn new(idle_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(idle_timeout)
            .build()
            .map_err(TranscriberError::Network)?;
        Ok(Self {
            client,
            timeout: idle_timeout,
        })
    }

    /// Stream the response body to `target` with a progress bar
    async fn download(&self, url: &str, target: &Path, quiet: bool) -> Result<u64> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| self.stalled())?
            .map_err(|e| self.fetch_error(e))?;

        if !response.status().is_success() {
            return Err(TranscriberError::MediaFetch(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let progress = progress_bar(response.content_length().unwrap_or(0), "Downloading media...", quiet);

        let mut file = fs_err::File::create(target).map_err(|e| TranscriberError::fs(target, e))?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = tokio::time::timeout(self.timeout, stream.next())
            .await
            .map_err(|_| self.stalled())?
        {
            let chunk = chunk.map_err(|e| self.fetch_error(e))?;
            file.write_all(&chunk).map_err(|e| TranscriberError::fs(target, e))?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }

        progress.finish_with_message("Download complete");
        Ok(downloaded)
    }

    fn stalled(&self) -> TranscriberError {
        TranscriberError::Timeout {
            operation: "media download (no data received)".to_string(),
            seconds: self.timeout.as_secs(),
        }
    }

    fn fetch_error(&self, error: reqwest::Error) -> TranscriberError {
        if error.is_timeout() {
            self.stalled()
        } else {
            TranscriberError::Network(error)
        }
    }
}

/// Last path segment of the URL, percent-decoded
fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .last()
        .filter(|name| !name.is_empty())
        .map(|name| urlencoding::decode(name).map(|n| n.into_owned()).unwrap_or_else(|_| name.to_string()))
}

fn media_extension(url: &Url) -> Option<String> {
    let name = file_name_from_url(url)?;
    let extension = Path::new(&name).extension()?.to_str()?.to_lowercase();
    MEDIA_EXTENSIONS.contains(&extension.as_str()).then_some(extension)
}

#[async_trait]
impl MediaSource for DirectExtractor {
    fn supports(&self, input: &str) -> bool {
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => media_extension(&url).is_some(),
            _ => false,
        }
    }

    fn platform_name(&self) -> &'static str {
        "Direct URL"
    }

    async fn fetch(&self, input: &str, ctx: &FetchContext) -> Result<FetchedMedia> {
        let url = Url::parse(input).map_err(|_| TranscriberError::InvalidInput(format!("Invalid URL: {}", input)))?;
        let extension = media_extension(&url).unwrap_or_else(|| "mp3".to_string());
        let title = file_name_from_url(&url).unwrap_or_else(|| "Direct media".to_string());

        let scratch = scratch_dir(&ctx.config.paths.audio_dir)?;
        let raw: PathBuf = scratch.path().join(format!("source.{}", extension));

        let size = self.download(input, &raw, ctx.quiet).await?;
        tracing::info!(size = %format_file_size(size), "Download complete");

        let audio = normalize_into_audio_dir(ctx, &raw, "direct").await?;

        Ok(FetchedMedia {
            audio,
            info: MediaInfo {
                title,
                author: extract_domain(input),
                duration_seconds: None,
                source: input.to_string(),
            },
            video_path: None,
        })
    }
}
