//! Media Transcriber - A Rust CLI tool for turning media into text
//!
//! This library fetches audio from YouTube, direct media URLs or local files, normalizes it,
//! sends it to a Whisper-compatible speech-to-text API (Groq or OpenAI) and writes the
//! transcript to disk. Audio above the upload limit is split into ten-minute segments that
//! are transcribed in order and joined back together.

use std::path::PathBuf;

pub mod cli;
pub mod config;
pub mod extractors;
pub mod media;
pub mod output;
pub mod providers;
pub mod transcribe;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{ExtractorRegistry, MediaInfo, MediaSource};
pub use media::{AudioArtifact, MediaToolkit, TempArtifact};
pub use providers::{select_provider, ProviderConfig, ProviderKind};
pub use transcribe::{LargeAudioTranscriber, TranscriptionOutcome, TranscriptionPipeline};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TranscriberError>;

/// Error types specific to the transcriber
#[derive(thiserror::Error, Debug)]
pub enum TranscriberError {
    #[error("No API key configured. Set GROQ_API_KEY or OPENAI_API_KEY (environment or .env)")]
    NoCredentialConfigured,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Media fetch failed: {0}")]
    MediaFetch(String),

    #[error("Media tool failed: {0}")]
    MediaTool(String),

    #[error("File operation failed on {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcription failed (HTTP {status}): {message}")]
    Transcription { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TranscriberError {
    /// Wrap an I/O error with the path it happened on
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
