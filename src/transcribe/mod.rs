use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::extractors::{ExtractorRegistry, FetchContext, MediaInfo};
use crate::media::{AudioArtifact, Ffmpeg, MediaToolkit, TempArtifact};
use crate::output;
use crate::providers::select_provider;
use crate::utils::{format_file_size, spinner};
use crate::{Result, TranscriberError};

pub mod client;
pub mod planner;

pub use client::{SpeechToText, WhisperClient};
pub use planner::{plan, ChunkPlan, Segment, DEFAULT_CHUNK_SECONDS};

/// Largest upload the Whisper APIs accept (25 MiB); files at exactly this size go up whole
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Result of one end-to-end run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionOutcome {
    /// The transcribed text
    pub text: String,

    /// Where the transcript file was written
    pub output_path: PathBuf,

    /// Media metadata used for the header
    pub info: MediaInfo,

    /// Normalized audio, if kept
    pub audio_path: Option<PathBuf>,

    /// Downloaded video, if kept
    pub video_path: Option<PathBuf>,
}

/// Transcribes one audio file, splitting it into ordered segments when it is too large to
/// upload in one request.
pub struct LargeAudioTranscriber {
    client: Arc<dyn SpeechToText>,
    toolkit: Arc<dyn MediaToolkit>,
    work_dir: PathBuf,
    threshold_bytes: u64,
    chunk_seconds: f64,
    quiet: bool,
}

impl LargeAudioTranscriber {
    pub fn new(client: Arc<dyn SpeechToText>, toolkit: Arc<dyn MediaToolkit>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            toolkit,
            work_dir: work_dir.into(),
            threshold_bytes: MAX_UPLOAD_BYTES,
            chunk_seconds: DEFAULT_CHUNK_SECONDS,
            quiet: true,
        }
    }

    pub fn with_threshold(mut self, threshold_bytes: u64) -> Self {
        self.threshold_bytes = threshold_bytes;
        self
    }

    pub fn with_chunk_seconds(mut self, chunk_seconds: f64) -> Self {
        self.chunk_seconds = chunk_seconds;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Transcribe the audio at `path`.
    ///
    /// Segments are extracted and transcribed strictly one after another and joined with a
    /// single space. The first failure aborts the whole run; no partial text is returned.
    pub async fn transcribe_audio(&self, path: &Path) -> Result<String> {
        let mut artifact = AudioArtifact::from_path(path)?;

        if artifact.size_bytes <= self.threshold_bytes {
            tracing::debug!(size = %format_file_size(artifact.size_bytes), "Uploading audio in one request");
            return self.client.transcribe(&artifact).await;
        }

        let duration = artifact.duration(self.toolkit.as_ref()).await?;
        let segments = plan(duration, self.chunk_seconds);

        if segments.is_empty() {
            tracing::warn!(duration, "Could not plan segments, uploading whole file");
            return self.client.transcribe(&artifact).await;
        }

        tracing::info!(
            size = %format_file_size(artifact.size_bytes),
            duration,
            segments = segments.len(),
            "Large file, transcribing in parts"
        );

        let work_dir = tempfile::Builder::new()
            .prefix("chunks_")
            .tempdir_in(&self.work_dir)
            .map_err(|e| TranscriberError::fs(&self.work_dir, e))?;

        let result = self.transcribe_segments(&artifact, &segments, work_dir.path()).await;

        let work_path = work_dir.path().to_path_buf();
        if let Err(e) = work_dir.close() {
            tracing::warn!(dir = %work_path.display(), error = %e, "Failed to remove segment directory");
        }

        result
    }

    async fn transcribe_segments(&self, source: &AudioArtifact, segments: &[Segment], work_dir: &Path) -> Result<String> {
        let progress = spinner("Transcribing...", self.quiet);
        let mut texts = Vec::with_capacity(segments.len());

        for segment in segments {
            progress.set_message(format!("Transcribing part {}/{}...", segment.index + 1, segments.len()));
            texts.push(self.transcribe_segment(source, segment, work_dir).await?);
        }

        progress.finish_with_message(format!("Transcribed {} parts", segments.len()));
        Ok(texts.join(" "))
    }

    async fn transcribe_segment(&self, source: &AudioArtifact, segment: &Segment, work_dir: &Path) -> Result<String> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let target = TempArtifact::new(work_dir.join(format!(
            "{}_chunk_{}_{}.mp3",
            source.base_name(),
            segment.index,
            &suffix[..8]
        )));

        self.toolkit.extract_segment(&source.path, target.path(), segment).await?;

        let chunk = AudioArtifact::from_path(target.path())?;
        let text = self.client.transcribe(&chunk).await?;

        tracing::debug!(index = segment.index, chars = text.len(), "Segment transcribed");
        Ok(text)
    }
}

/// Fetch, transcribe and save: the whole run for one input
pub struct TranscriptionPipeline {
    config: Arc<Config>,
    registry: ExtractorRegistry,
    toolkit: Arc<dyn MediaToolkit>,
    transcriber: LargeAudioTranscriber,
    quiet: bool,
}

impl TranscriptionPipeline {
    /// Build the pipeline with the real collaborators.
    ///
    /// Fails with [`TranscriberError::NoCredentialConfigured`] before anything touches the
    /// filesystem or network.
    pub fn new(config: Config, quiet: bool) -> Result<Self> {
        let provider = select_provider(&config.credentials)?;
        tracing::info!(provider = provider.name(), model = %provider.model, "Using transcription provider");

        let client = WhisperClient::new(provider, config.app.language.clone(), config.request_timeout())?;
        let toolkit: Arc<dyn MediaToolkit> = Arc::new(Ffmpeg::new(config.process_timeout()));
        let registry = ExtractorRegistry::new(config.request_timeout())?;

        Ok(Self::with_components(config, registry, Arc::new(client), toolkit, quiet))
    }

    pub fn with_components(
        config: Config,
        registry: ExtractorRegistry,
        client: Arc<dyn SpeechToText>,
        toolkit: Arc<dyn MediaToolkit>,
        quiet: bool,
    ) -> Self {
        let transcriber =
            LargeAudioTranscriber::new(client, toolkit.clone(), config.paths.audio_dir.clone()).with_quiet(quiet);

        Self {
            config: Arc::new(config),
            registry,
            toolkit,
            transcriber,
            quiet,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transcribe a YouTube link, direct media URL or local file and write the transcript.
    ///
    /// The normalized audio is removed on every exit path unless `keep_audio` is set and the
    /// run succeeded.
    pub async fn transcribe(&self, input: &str) -> Result<TranscriptionOutcome> {
        let ctx = FetchContext {
            config: self.config.clone(),
            toolkit: self.toolkit.clone(),
            quiet: self.quiet,
        };

        let fetched = self.registry.fetch(input, &ctx).await?;

        tracing::info!("Transcribing (this may take a few minutes)...");
        let text = self.transcriber.transcribe_audio(fetched.audio.path()).await?;

        let output_path = output::save_transcription(
            &text,
            &fetched.info,
            &self.config.paths.transcription_dir,
            &Local::now(),
        )?;

        let audio_path = if self.config.app.keep_audio {
            let kept = fetched.audio.keep();
            tracing::info!(path = %kept.display(), "Audio kept");
            Some(kept)
        } else {
            drop(fetched.audio);
            None
        };

        Ok(TranscriptionOutcome {
            text,
            output_path,
            info: fetched.info,
            audio_path,
            video_path: fetched.video_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::client::MockSpeechToText;
    use super::*;
    use crate::extractors::{FetchedMedia, MediaSource};
    use crate::media::MockMediaToolkit;
    use async_trait::async_trait;
    use mockall::Sequence;
    use std::sync::Mutex;
    use tokio_test::assert_err;

    /// Creates a sparse file of exactly `len` bytes
    fn audio_file(dir: &Path, name: &str, len: u64) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(len).unwrap();
        path
    }

    fn file_names(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    /// Toolkit whose extraction writes a small file and records the segment
    fn recording_toolkit(duration: f64, extracted: Arc<Mutex<Vec<(Segment, PathBuf)>>>) -> MockMediaToolkit {
        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().times(1).returning(move |_| Ok(duration));
        toolkit.expect_extract_segment().returning(move |_, target, segment| {
            std::fs::write(target, b"segment").unwrap();
            extracted.lock().unwrap().push((*segment, target.to_path_buf()));
            Ok(())
        });
        toolkit
    }

    #[tokio::test]
    async fn test_small_file_goes_up_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "small.mp3", 1024);

        let mut client = MockSpeechToText::new();
        let expected = path.clone();
        client
            .expect_transcribe()
            .withf(move |artifact| artifact.path == expected)
            .times(1)
            .returning(|_| Ok("ciao".to_string()));

        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().never();
        toolkit.expect_extract_segment().never();

        let transcriber = LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path());
        assert_eq!(transcriber.transcribe_audio(&path).await.unwrap(), "ciao");
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "exact.mp3", MAX_UPLOAD_BYTES);

        let mut client = MockSpeechToText::new();
        client.expect_transcribe().times(1).returning(|_| Ok("whole".to_string()));

        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().never();
        toolkit.expect_extract_segment().never();

        let transcriber = LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path());
        assert_eq!(transcriber.transcribe_audio(&path).await.unwrap(), "whole");
    }

    #[tokio::test]
    async fn test_large_file_is_split_and_joined_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "lecture.mp3", MAX_UPLOAD_BYTES + 1);

        let extracted = Arc::new(Mutex::new(Vec::new()));
        let toolkit = recording_toolkit(2100.0, extracted.clone());

        let mut client = MockSpeechToText::new();
        let mut seq = Sequence::new();
        for text in ["a", "b", "c", "d"] {
            client
                .expect_transcribe()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |artifact| {
                    assert!(artifact.path.exists(), "segment must exist while it is transcribed");
                    Ok(text.to_string())
                });
        }

        let transcriber = LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path());
        let text = transcriber.transcribe_audio(&path).await.unwrap();

        assert_eq!(text, "a b c d");

        let extracted = extracted.lock().unwrap();
        let starts: Vec<f64> = extracted.iter().map(|(s, _)| s.start_seconds).collect();
        let lengths: Vec<f64> = extracted.iter().map(|(s, _)| s.length_seconds).collect();
        assert_eq!(starts, vec![0.0, 600.0, 1200.0, 1800.0]);
        assert_eq!(lengths, vec![600.0, 600.0, 600.0, 300.0]);

        for (segment, target) in extracted.iter() {
            let name = target.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(&format!("lecture_chunk_{}_", segment.index)), "{name}");
            assert!(!target.exists(), "segment file should be deleted");
        }

        assert_eq!(file_names(dir.path()), vec!["lecture.mp3".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_segment_aborts_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "talk.mp3", 4096);

        let extracted = Arc::new(Mutex::new(Vec::new()));
        let toolkit = recording_toolkit(1500.0, extracted.clone());

        let mut client = MockSpeechToText::new();
        let mut seq = Sequence::new();
        client
            .expect_transcribe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("first".to_string()));
        client
            .expect_transcribe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(TranscriberError::Transcription {
                    status: 500,
                    message: "boom".to_string(),
                })
            });

        let transcriber =
            LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path()).with_threshold(1024);
        let err = transcriber.transcribe_audio(&path).await.unwrap_err();

        assert!(matches!(err, TranscriberError::Transcription { status: 500, .. }));
        // third segment is never extracted
        assert_eq!(extracted.lock().unwrap().len(), 2);
        assert_eq!(file_names(dir.path()), vec!["talk.mp3".to_string()]);
    }

    #[tokio::test]
    async fn test_extraction_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "talk.mp3", 4096);

        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().returning(|_| Ok(900.0));
        toolkit
            .expect_extract_segment()
            .times(1)
            .returning(|_, _, _| Err(TranscriberError::MediaTool("ffmpeg exploded".to_string())));

        let mut client = MockSpeechToText::new();
        client.expect_transcribe().never();

        let transcriber =
            LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path()).with_threshold(1024);

        assert_err!(transcriber.transcribe_audio(&path).await);
        assert_eq!(file_names(dir.path()), vec!["talk.mp3".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_duration_falls_back_to_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "odd.mp3", 4096);

        let mut toolkit = MockMediaToolkit::new();
        toolkit.expect_probe_duration().returning(|_| Ok(0.0));
        toolkit.expect_extract_segment().never();

        let mut client = MockSpeechToText::new();
        client.expect_transcribe().times(1).returning(|_| Ok("whole".to_string()));

        let transcriber =
            LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path()).with_threshold(1024);
        assert_eq!(transcriber.transcribe_audio(&path).await.unwrap(), "whole");
    }

    #[tokio::test]
    async fn test_custom_chunk_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_file(dir.path(), "clip.mp3", 4096);

        let extracted = Arc::new(Mutex::new(Vec::new()));
        let toolkit = recording_toolkit(25.0, extracted.clone());

        let mut client = MockSpeechToText::new();
        client.expect_transcribe().times(3).returning(|_| Ok("x".to_string()));

        let transcriber = LargeAudioTranscriber::new(Arc::new(client), Arc::new(toolkit), dir.path())
            .with_threshold(1024)
            .with_chunk_seconds(10.0);
        assert_eq!(transcriber.transcribe_audio(&path).await.unwrap(), "x x x");

        let last = extracted.lock().unwrap().last().map(|(segment, _)| *segment);
        assert_eq!(
            last,
            Some(Segment {
                index: 2,
                start_seconds: 20.0,
                length_seconds: 5.0,
            })
        );
    }

    #[tokio::test]
    async fn test_missing_audio_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = LargeAudioTranscriber::new(
            Arc::new(MockSpeechToText::new()),
            Arc::new(MockMediaToolkit::new()),
            dir.path(),
        );

        let err = transcriber.transcribe_audio(&dir.path().join("gone.mp3")).await.unwrap_err();
        assert!(matches!(err, TranscriberError::Filesystem { .. }));
    }

    /// Source that drops a small audio file into the audio directory
    struct FakeSource;

    #[async_trait]
    impl MediaSource for FakeSource {
        fn supports(&self, input: &str) -> bool {
            input.starts_with("fake://")
        }

        fn platform_name(&self) -> &'static str {
            "Fake"
        }

        async fn fetch(&self, input: &str, ctx: &FetchContext) -> Result<FetchedMedia> {
            let path = ctx.config.paths.audio_dir.join("fetched.mp3");
            std::fs::write(&path, b"audio").unwrap();
            Ok(FetchedMedia {
                audio: TempArtifact::new(path),
                info: MediaInfo {
                    title: "My Video!".to_string(),
                    author: Some("Tester".to_string()),
                    duration_seconds: Some(65.0),
                    source: input.to_string(),
                },
                video_path: None,
            })
        }
    }

    fn pipeline(root: &Path, keep_audio: bool, client: MockSpeechToText) -> TranscriptionPipeline {
        let mut config = Config::default();
        config.paths.video_dir = root.join("video");
        config.paths.audio_dir = root.join("audio");
        config.paths.transcription_dir = root.join("out");
        config.app.keep_audio = keep_audio;
        config.ensure_directories().unwrap();

        let mut registry = ExtractorRegistry::empty();
        registry.register(Box::new(FakeSource));

        TranscriptionPipeline::with_components(
            config,
            registry,
            Arc::new(client),
            Arc::new(MockMediaToolkit::new()),
            true,
        )
    }

    #[tokio::test]
    async fn test_pipeline_writes_transcript_and_removes_audio() {
        let root = tempfile::tempdir().unwrap();
        let mut client = MockSpeechToText::new();
        client.expect_transcribe().times(1).returning(|_| Ok("hello world".to_string()));

        let pipeline = pipeline(root.path(), false, client);
        let outcome = pipeline.transcribe("fake://video").await.unwrap();

        assert_eq!(outcome.text, "hello world");
        assert!(outcome.audio_path.is_none());
        assert!(!root.path().join("audio").join("fetched.mp3").exists());

        let name = outcome.output_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("My_Video_") && name.ends_with(".txt"), "{name}");
        let content = std::fs::read_to_string(&outcome.output_path).unwrap();
        assert!(content.contains("Title: My Video!"));
        assert!(content.contains("Author: Tester"));
        assert!(content.contains("Duration: 1:05"));
        assert!(content.contains("Source: fake://video"));
        assert!(content.contains("hello world"));
    }

    #[tokio::test]
    async fn test_pipeline_keeps_audio_when_configured() {
        let root = tempfile::tempdir().unwrap();
        let mut client = MockSpeechToText::new();
        client.expect_transcribe().returning(|_| Ok("ok".to_string()));

        let pipeline = pipeline(root.path(), true, client);
        let outcome = pipeline.transcribe("fake://video").await.unwrap();

        let kept = outcome.audio_path.unwrap();
        assert_eq!(kept, root.path().join("audio").join("fetched.mp3"));
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn test_pipeline_failure_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let mut client = MockSpeechToText::new();
        client.expect_transcribe().returning(|_| {
            Err(TranscriberError::Transcription {
                status: 401,
                message: "Invalid API Key".to_string(),
            })
        });

        let pipeline = pipeline(root.path(), true, client);
        let err = pipeline.transcribe("fake://video").await.unwrap_err();

        assert!(matches!(err, TranscriberError::Transcription { status: 401, .. }));
        assert!(file_names(&root.path().join("out")).is_empty());
        assert!(!root.path().join("audio").join("fetched.mp3").exists());
    }

    #[tokio::test]
    async fn test_pipeline_rejects_unknown_input() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(root.path(), false, MockSpeechToText::new());

        let err = pipeline.transcribe("gopher://nothing").await.unwrap_err();
        assert!(matches!(err, TranscriberError::InvalidInput(_)));
    }

    #[test]
    fn test_pipeline_requires_credentials() {
        let err = TranscriptionPipeline::new(Config::default(), true).err().unwrap();
        assert!(matches!(err, TranscriberError::NoCredentialConfigured));
    }
}
