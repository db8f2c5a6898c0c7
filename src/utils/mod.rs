use indicatif::{ProgressBar, ProgressStyle};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use url::Url;

use crate::{Result, TranscriberError};

/// Longest file name stem produced by [`sanitize_filename`]
const MAX_FILENAME_CHARS: usize = 100;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration as a clock: `m:ss`, or `h:mm:ss` past the hour
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Turn a media title into a file name stem.
///
/// Keeps alphanumerics, `-`, `_` and `.`; drops other punctuation; whitespace runs become a
/// single `_`.
pub fn sanitize_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '_' | '.'))
        .collect();

    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = joined.chars().take(MAX_FILENAME_CHARS).collect();

    if truncated.is_empty() {
        "transcription".to_string()
    } else {
        truncated
    }
}

/// Extract host from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(|host| host.trim_start_matches("www.").to_string())
}

/// Run an external program to completion under a deadline.
///
/// The child is killed if the deadline passes or the returned future is dropped. A non-zero
/// exit status is not an error here; callers inspect `stderr` themselves.
pub async fn run_command(mut command: Command, timeout: Duration, operation: &str) -> Result<Output> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

    match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Err(TranscriberError::MediaTool(format!(
            "{}: program not found in PATH",
            operation
        ))),
        Ok(Err(e)) => Err(TranscriberError::MediaTool(format!("{}: {}", operation, e))),
        Err(_) => Err(TranscriberError::Timeout {
            operation: operation.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

/// Spinner for work of unknown length; hidden when `quiet`
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    let progress = if quiet { ProgressBar::hidden() } else { ProgressBar::new_spinner() };

    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    if !quiet {
        progress.enable_steady_tick(Duration::from_millis(120));
    }
    progress.set_message(message.to_string());
    progress
}

/// Byte progress bar; hidden when `quiet`
pub fn progress_bar(total_bytes: u64, message: &str, quiet: bool) -> ProgressBar {
    let progress = if quiet { ProgressBar::hidden() } else { ProgressBar::new(total_bytes) };

    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress.set_message(message.to_string());
    progress
}

/// Check if the current environment has required tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp", "--version").await {
        missing.push("yt-dlp - required for YouTube downloads".to_string());
    }

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for audio conversion and splitting".to_string());
    }

    if !check_command_available("ffprobe", "-version").await {
        missing.push("ffprobe - required to measure long recordings".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    let mut cmd = Command::new(command);
    cmd.arg(version_flag);

    run_command(cmd, Duration::from_secs(10), command)
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
