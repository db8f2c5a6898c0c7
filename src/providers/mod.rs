//! Speech-to-text provider selection.
//!
//! Both supported providers speak the OpenAI audio transcription API, so a provider is just a
//! credential, an endpoint and a model identifier. Selection only inspects configuration and
//! never touches the network or the filesystem.

use serde::Serialize;

use crate::config::Credentials;
use crate::{Result, TranscriberError};

const GROQ_TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const GROQ_MODEL: &str = "whisper-large-v3";

const OPENAI_TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const OPENAI_MODEL: &str = "whisper-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProviderKind {
    Groq,
    OpenAi,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "Groq",
            ProviderKind::OpenAi => "OpenAI",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Groq => GROQ_TRANSCRIPTION_URL,
            ProviderKind::OpenAi => OPENAI_TRANSCRIPTION_URL,
        }
    }

    pub fn model(&self) -> &'static str {
        match self {
            ProviderKind::Groq => GROQ_MODEL,
            ProviderKind::OpenAi => OPENAI_MODEL,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved backend for one transcription request. Immutable once selected.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub credential: String,
    pub endpoint: String,
    pub model: String,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, credential: impl Into<String>) -> Self {
        Self {
            kind,
            credential: credential.into(),
            endpoint: kind.endpoint().to_string(),
            model: kind.model().to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("credential", &"***")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

/// Pick the first configured provider: Groq, then OpenAI.
pub fn select_provider(credentials: &Credentials) -> Result<ProviderConfig> {
    let candidates = [
        (ProviderKind::Groq, credentials.groq_api_key.as_deref()),
        (ProviderKind::OpenAi, credentials.openai_api_key.as_deref()),
    ];

    let (kind, key) = candidates
        .into_iter()
        .find_map(|(kind, key)| key.filter(|k| !k.trim().is_empty()).map(|k| (kind, k)))
        .ok_or(TranscriberError::NoCredentialConfigured)?;

    tracing::debug!(provider = %kind, model = kind.model(), "Selected transcription provider");
    Ok(ProviderConfig::new(kind, key))
}
