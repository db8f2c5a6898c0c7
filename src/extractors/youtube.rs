use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use url::Url;

use super::{normalize_into_audio_dir, scratch_dir, FetchContext, FetchedMedia, MediaInfo, MediaSource};
use crate::utils::{run_command, sanitize_filename, spinner};
use crate::{Result, TranscriberError};

/// Subset of `yt-dlp --dump-single-json` we care about
#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    title: String,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
}

/// YouTube extractor using yt-dlp
pub struct YoutubeExtractor {
    yt_dlp_path: String,
}

impl YoutubeExtractor {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }

    async fn run_yt_dlp(&self, args: &[&str], ctx: &FetchContext) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.yt_dlp_path);
        command.args(["--no-playlist", "--no-warnings"]).args(args);

        let output = run_command(command, ctx.config.process_timeout(), "yt-dlp").await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::MediaFetch(super::translate_fetch_error(&error)));
        }

        Ok(output.stdout)
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str, ctx: &FetchContext) -> Result<VideoInfo> {
        tracing::debug!("Extracting video info for: {}", url);

        let stdout = self.run_yt_dlp(&["--dump-single-json", url], ctx).await?;

        serde_json::from_slice(&stdout)
            .map_err(|e| TranscriberError::MediaFetch(format!("Unexpected yt-dlp metadata: {}", e)))
    }

    /// Download the full video as mp4 into the video directory
    async fn download_video(&self, url: &str, info: &VideoInfo, ctx: &FetchContext) -> Result<PathBuf> {
        let output_path = ctx
            .config
            .paths
            .video_dir
            .join(format!("{}_{}.mp4", sanitize_filename(&info.title), info.id));
        let output_arg = output_path.to_string_lossy().into_owned();

        self.run_yt_dlp(
            &[
                "--format",
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
                "--merge-output-format",
                "mp4",
                "--output",
                &output_arg,
                url,
            ],
            ctx,
        )
        .await?;

        Ok(output_path)
    }

    /// Download best audio into `scratch` and return the downloaded file
    async fn download_audio(&self, url: &str, info: &VideoInfo, scratch: &Path, ctx: &FetchContext) -> Result<PathBuf> {
        let template = scratch.join(format!("{}.%(ext)s", info.id));
        let template_arg = template.to_string_lossy().into_owned();

        self.run_yt_dlp(
            &[
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                "--output",
                &template_arg,
                url,
            ],
            ctx,
        )
        .await?;

        find_download(scratch, &info.id)
    }
}

/// yt-dlp picks the final extension itself, so look the file up by id
fn find_download(dir: &Path, id: &str) -> Result<PathBuf> {
    let entries = fs_err::read_dir(dir).map_err(|e| TranscriberError::fs(dir, e))?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(id))
                .unwrap_or(false)
        })
        .ok_or_else(|| TranscriberError::MediaFetch("Audio file not found after download".to_string()))
}

/// Video id if `url` is a watch, embed, v, shorts or youtu.be link
pub fn video_id(url: &str) -> Option<String> {
    let with_scheme = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };

    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

    let id = match (host, segments.as_slice()) {
        ("youtu.be", [id, ..]) => Some(id.to_string()),
        ("youtube.com", ["watch"]) => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned()),
        ("youtube.com", ["embed" | "v" | "shorts", id, ..]) => Some(id.to_string()),
        _ => None,
    }?;

    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

#[async_trait]
impl MediaSource for YoutubeExtractor {
    fn supports(&self, input: &str) -> bool {
        video_id(input).is_some()
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }

    async fn fetch(&self, url: &str, ctx: &FetchContext) -> Result<FetchedMedia> {
        let progress = spinner("Fetching video information...", ctx.quiet);
        let info = self.get_video_info(url, ctx).await?;
        let author = info.uploader.clone().or_else(|| info.channel.clone());
        tracing::info!(title = %info.title, author = author.as_deref().unwrap_or("unknown"), "Video found");

        let video_path = if ctx.config.app.keep_video {
            progress.set_message("Downloading video with yt-dlp...");
            match self.download_video(url, &info, ctx).await {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "Video saved");
                    Some(path)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Video download failed, continuing with audio only");
                    None
                }
            }
        } else {
            None
        };

        let stem = format!("{}_{}", sanitize_filename(&info.title), info.id);
        let audio = match &video_path {
            Some(video) => {
                progress.set_message("Extracting audio from video...");
                normalize_into_audio_dir(ctx, video, &stem).await?
            }
            None => {
                progress.set_message("Downloading audio with yt-dlp...");
                let scratch = scratch_dir(&ctx.config.paths.audio_dir)?;
                let raw = self.download_audio(url, &info, scratch.path(), ctx).await?;

                progress.set_message("Optimizing audio for transcription...");
                normalize_into_audio_dir(ctx, &raw, &stem).await?
            }
        };
        progress.finish_with_message("Audio ready");

        Ok(FetchedMedia {
            audio,
            info: MediaInfo {
                title: info.title,
                author,
                duration_seconds: info.duration,
                source: url.to_string(),
            },
            video_path,
        })
    }
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}
