//! Base trait and types for streaming text-generation backends.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by text-generation backends.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error ({status}): {body}")]
    ProviderError { status: u16, body: String },

    #[error("Unsupported LLM backend: {0}. Supported backends: mistral, openai")]
    UnsupportedBackend(String),
}

pub type LLMResult<T> = Result<T, LLMError>;

/// Incremental reply tokens for one request.
///
/// An `Err` item is a transport failure; the stream ends after it.
pub type TokenStream = Pin<Box<dyn Stream<Item = LLMResult<String>> + Send>>;

/// Language-model backend selectable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMBackend {
    /// Mistral served by a local Ollama instance
    #[default]
    Mistral,
    /// OpenAI Chat Completions
    OpenAI,
}

impl LLMBackend {
    pub const ALL: [LLMBackend; 2] = [LLMBackend::Mistral, LLMBackend::OpenAI];

    pub const fn as_str(self) -> &'static str {
        match self {
            LLMBackend::Mistral => "mistral",
            LLMBackend::OpenAI => "openai",
        }
    }

    /// Exact, case-sensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|backend| backend.as_str() == name)
    }
}

impl fmt::Display for LLMBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LLMBackend {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mistral" => Ok(LLMBackend::Mistral),
            "openai" => Ok(LLMBackend::OpenAI),
            _ => Err(LLMError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Connection settings for a backend.
#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Fixed persona sent as the system message of every request.
    pub system_prompt: String,
}

/// Streaming text generation, one request per finalized utterance.
#[async_trait]
pub trait BaseLLM: Send + Sync {
    /// Send `utterance` and return the reply as a token stream.
    ///
    /// Errors returned here happen before any token (connection refused,
    /// non-success status). Malformed chunks inside the stream are logged and
    /// skipped by the implementation.
    async fn stream_reply(&self, utterance: &str) -> LLMResult<TokenStream>;

    fn backend(&self) -> LLMBackend;
}
