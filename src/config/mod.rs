use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, TranscriberError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider credentials
    pub credentials: Credentials,

    /// Storage locations
    pub paths: PathsConfig,

    /// Application settings
    pub app: AppConfig,
}

/// API keys for the two interchangeable providers. Groq is checked first.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(serialize_with = "redact")]
    pub groq_api_key: Option<String>,

    #[serde(serialize_with = "redact")]
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "***"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

fn redact<S: serde::Serializer>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("***"),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where kept videos are stored
    pub video_dir: PathBuf,

    /// Where normalized audio and temporary segments live
    pub audio_dir: PathBuf,

    /// Where transcripts are written
    pub transcription_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Keep normalized audio after transcription
    pub keep_audio: bool,

    /// Download and keep the video for YouTube sources
    pub keep_video: bool,

    /// Verbose diagnostics
    pub debug: bool,

    /// Language sent to the provider
    pub language: String,

    /// Deadline for a single HTTP request
    pub request_timeout_secs: u64,

    /// Deadline for a single external process (yt-dlp, ffmpeg, ffprobe)
    pub process_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            paths: PathsConfig {
                video_dir: PathBuf::from("downloads").join("videos"),
                audio_dir: PathBuf::from("downloads").join("audio"),
                transcription_dir: PathBuf::from("output"),
            },
            app: AppConfig {
                keep_audio: false,
                keep_video: false,
                debug: false,
                language: "it".to_string(),
                request_timeout_secs: 600,
                process_timeout_secs: 1800,
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present
    pub fn load() -> Result<Self> {
        // Runs before the subscriber exists, so nothing here can log
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(TranscriberError::Config(format!("Failed to read .env: {}", e))),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| lookup(key).map(|v| v.trim() == "true").unwrap_or(false);
        let seconds = |key: &str, default: u64| -> Result<u64> {
            match non_empty(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| TranscriberError::Config(format!("{} must be a positive integer, got '{}'", key, raw))),
                None => Ok(default),
            }
        };

        Ok(Self {
            credentials: Credentials {
                groq_api_key: non_empty("GROQ_API_KEY"),
                openai_api_key: non_empty("OPENAI_API_KEY"),
            },
            paths: PathsConfig {
                video_dir: non_empty("VIDEO_PATH").map(PathBuf::from).unwrap_or(defaults.paths.video_dir),
                audio_dir: non_empty("AUDIO_PATH").map(PathBuf::from).unwrap_or(defaults.paths.audio_dir),
                transcription_dir: non_empty("TRANSCRIPTION_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.paths.transcription_dir),
            },
            app: AppConfig {
                keep_audio: flag("KEEP_AUDIO"),
                keep_video: flag("KEEP_VIDEO"),
                debug: flag("DEBUG"),
                language: non_empty("TRANSCRIPTION_LANGUAGE").unwrap_or(defaults.app.language),
                request_timeout_secs: seconds("REQUEST_TIMEOUT_SECS", defaults.app.request_timeout_secs)?,
                process_timeout_secs: seconds("PROCESS_TIMEOUT_SECS", defaults.app.process_timeout_secs)?,
            },
        })
    }

    /// Create the storage directories if needed and check they are writable
    pub fn ensure_directories(&self) -> Result<()> {
        for (name, dir) in [
            ("Video", &self.paths.video_dir),
            ("Audio", &self.paths.audio_dir),
            ("Transcriptions", &self.paths.transcription_dir),
        ] {
            ensure_writable_dir(dir)?;
            tracing::debug!(dir = %dir.display(), "{} directory ready", name);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.app.process_timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| TranscriberError::Config(format!("Failed to serialize config: {}", e)))?;
        println!("Current Configuration:");
        print!("{}", content);
        Ok(())
    }
}

fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs_err::create_dir_all(dir).map_err(|e| TranscriberError::fs(dir, e))?;

    let metadata = fs_err::metadata(dir).map_err(|e| TranscriberError::fs(dir, e))?;
    if metadata.permissions().readonly() {
        return Err(TranscriberError::fs(
            dir,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "directory is read-only"),
        ));
    }
    Ok(())
}
