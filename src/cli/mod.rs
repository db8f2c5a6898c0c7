use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "transcriber",
    about = "Media Transcriber - Turn YouTube videos, media links and local files into text",
    version,
    long_about = "A CLI tool that downloads or reads media, extracts a speech-optimized audio track and transcribes it with Whisper via Groq or OpenAI. Long recordings are split into ten-minute parts automatically."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a YouTube video, direct media URL or local file
    Transcribe {
        /// YouTube link, direct link to an audio/video file, or path to a local file
        #[arg(value_name = "URL_OR_FILE")]
        input: String,

        /// Keep the normalized audio file (overrides KEEP_AUDIO)
        #[arg(long)]
        keep_audio: bool,

        /// Also download and keep the video for YouTube sources (overrides KEEP_VIDEO)
        #[arg(long)]
        keep_video: bool,

        /// Language of the spoken audio, ISO-639-1 (overrides TRANSCRIPTION_LANGUAGE)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,
    },

    /// Show configuration, or the environment variables it is read from
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported input types
    Platforms,
}

/// Environment variables read at startup, in `.env` format
pub const ENV_TEMPLATE: &str = "\
# At least one API key is required. Groq is used when both are set.
GROQ_API_KEY=
OPENAI_API_KEY=

# Storage locations
VIDEO_PATH=downloads/videos
AUDIO_PATH=downloads/audio
TRANSCRIPTION_PATH=output

# Keep intermediate files (true/false)
KEEP_AUDIO=false
KEEP_VIDEO=false

# Spoken language and deadlines
TRANSCRIPTION_LANGUAGE=it
REQUEST_TIMEOUT_SECS=600
PROCESS_TIMEOUT_SECS=1800

DEBUG=false
";
