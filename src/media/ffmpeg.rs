use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::MediaToolkit;
use crate::transcribe::planner::Segment;
use crate::utils::run_command;
use crate::{Result, TranscriberError};

/// Audio bitrate used for every file handed to the provider
const AUDIO_BITRATE: &str = "128k";
/// Whisper models are trained on 16 kHz mono
const SAMPLE_RATE: &str = "16000";

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` binaries
pub struct Ffmpeg {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(timeout: Duration) -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            timeout,
        }
    }

    async fn run_ffmpeg(&self, args: Vec<String>, operation: &str) -> Result<()> {
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(["-hide_banner", "-loglevel", "error", "-y"]).args(&args);

        let output = run_command(command, self.timeout, operation).await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::MediaTool(format!("{} failed: {}", operation, error.trim())));
        }

        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl MediaToolkit for Ffmpeg {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let mut command = Command::new(&self.ffprobe_path);
        command.args(["-v", "quiet", "-print_format", "json", "-show_format"]).arg(path);

        let output = run_command(command, self.timeout, "ffprobe").await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::MediaTool(format!(
                "Failed to analyze {} with ffprobe: {}",
                path.display(),
                error.trim()
            )));
        }

        parse_probe_duration(&output.stdout)
    }

    async fn extract_segment(&self, source: &Path, target: &Path, segment: &Segment) -> Result<()> {
        tracing::debug!(
            index = segment.index,
            start = segment.start_seconds,
            length = segment.length_seconds,
            "Extracting audio segment"
        );

        let args = vec![
            "-ss".to_string(),
            format!("{:.3}", segment.start_seconds),
            "-t".to_string(),
            format!("{:.3}", segment.length_seconds),
            "-i".to_string(),
            path_arg(source),
            "-vn".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            AUDIO_BITRATE.to_string(),
            path_arg(target),
        ];

        self.run_ffmpeg(args, "ffmpeg segment extraction").await
    }

    async fn normalize(&self, source: &Path, target: &Path) -> Result<()> {
        tracing::debug!("Converting {} to MP3", source.display());

        let args = vec![
            "-i".to_string(),
            path_arg(source),
            "-vn".to_string(),
            "-acodec".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            AUDIO_BITRATE.to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            SAMPLE_RATE.to_string(),
            "-f".to_string(),
            "mp3".to_string(),
            path_arg(target),
        ];

        self.run_ffmpeg(args, "ffmpeg conversion").await
    }
}

/// Pull `format.duration` out of `ffprobe -print_format json` output
fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let info: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| TranscriberError::MediaTool(format!("Unreadable ffprobe output: {}", e)))?;

    let duration = &info["format"]["duration"];
    duration
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| duration.as_f64())
        .ok_or_else(|| TranscriberError::MediaTool("ffprobe reported no duration".to_string()))
}
