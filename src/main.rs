use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_transcriber::cli::{Cli, Commands, ENV_TEMPLATE};
use media_transcriber::utils::{self, format_duration};
use media_transcriber::{Config, ExtractorRegistry, TranscriptionPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;

    // Initialize tracing
    let default_filter = if cli.verbose || config.app.debug {
        "media_transcriber=debug"
    } else {
        "media_transcriber=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Transcribe {
            input,
            keep_audio,
            keep_video,
            language,
        } => {
            config.app.keep_audio |= keep_audio;
            config.app.keep_video |= keep_video;
            if let Some(language) = language {
                config.app.language = language;
            }

            // Credentials are checked before any directory or media work
            let pipeline = TranscriptionPipeline::new(config, cli.quiet)?;
            pipeline.config().ensure_directories()?;

            // Check for required external dependencies (non-fatal)
            let missing_deps = utils::check_dependencies().await;
            if !missing_deps.is_empty() {
                eprintln!("{}", style("Dependency check warnings:").yellow());
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            tracing::info!("Starting transcription for: {}", input);

            // Dropping the pipeline future on Ctrl-C kills child processes and removes temp files
            let outcome = tokio::select! {
                result = pipeline.transcribe(&input) => result?,
                _ = tokio::signal::ctrl_c() => {
                    anyhow::bail!("Interrupted, temporary files removed");
                }
            };

            println!("{}", style("Transcription complete!").green().bold());
            println!("Transcript saved to: {}", outcome.output_path.display());
            if let Some(duration) = outcome.info.duration_seconds {
                println!("Duration: {}", format_duration(duration));
            }
            if let Some(video_path) = outcome.video_path {
                println!("Video saved to: {}", video_path.display());
            }
            if let Some(audio_path) = outcome.audio_path {
                println!("Audio saved to: {}", audio_path.display());
            }
        }
        Commands::Config { show } => {
            if show {
                config.display()?;
            } else {
                println!("Configuration is read from the environment and an optional .env file:\n");
                print!("{}", ENV_TEMPLATE);
            }
        }
        Commands::Platforms => {
            let registry = ExtractorRegistry::new(config.request_timeout())?;
            println!("Supported inputs (checked in this order):");
            for platform in registry.list_platforms() {
                println!("  • {}", platform);
            }
        }
    }

    Ok(())
}
