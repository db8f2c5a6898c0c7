use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;

use crate::media::AudioArtifact;
use crate::providers::ProviderConfig;
use crate::{Result, TranscriberError};

/// Sends one audio file to a speech-to-text backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, artifact: &AudioArtifact) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the OpenAI-compatible `audio/transcriptions` endpoint
pub struct WhisperClient {
    client: reqwest::Client,
    provider: ProviderConfig,
    language: String,
    timeout: Duration,
}

impl WhisperClient {
    pub fn new(provider: ProviderConfig, language: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TranscriberError::Network)?;

        Ok(Self {
            client,
            provider,
            language: language.into(),
            timeout,
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> TranscriberError {
        if error.is_timeout() {
            TranscriberError::Timeout {
                operation: format!("{} transcription request", self.provider.name()),
                seconds: self.timeout.as_secs(),
            }
        } else {
            TranscriberError::Network(error)
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, artifact: &AudioArtifact) -> Result<String> {
        let bytes = tokio::fs::read(&artifact.path)
            .await
            .map_err(|e| TranscriberError::fs(&artifact.path, e))?;

        tracing::debug!(
            provider = self.provider.name(),
            model = %self.provider.model,
            file = %artifact.path.display(),
            bytes = bytes.len(),
            "Sending audio to transcription API"
        );

        let file_part = multipart::Part::bytes(bytes)
            .file_name(artifact.file_name())
            .mime_str("audio/mpeg")
            .map_err(TranscriberError::Network)?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.provider.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.provider.endpoint)
            .bearer_auth(&self.provider.credential)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown error");
            return Err(TranscriberError::Transcription {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| reason.to_string()),
            });
        }

        let text = parse_transcript(&body).map_err(|message| TranscriberError::Transcription {
            status: status.as_u16(),
            message,
        })?;

        tracing::debug!(chars = text.len(), "Transcription response received");
        Ok(text)
    }
}

/// Provider-supplied `error.message`, if the body carries one
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.trim().is_empty())
}

fn parse_transcript(body: &str) -> std::result::Result<String, String> {
    serde_json::from_str::<TranscriptionResponse>(body)
        .map(|r| r.text.trim().to_string())
        .map_err(|e| format!("Unexpected response body: {}", e))
}
