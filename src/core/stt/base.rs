//! Base trait and types for streaming speech-to-text providers.
//!
//! Providers are channel based: [`BaseSTT::connect`] takes the sending half
//! of a fragment channel and the provider pushes every recognized
//! [`TranscriptFragment`] into it until disconnected.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::audio::AudioFormat;

/// Errors raised by speech-to-text providers.
#[derive(Debug, Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Not connected")]
    NotConnected,
}

pub type STTResult<T> = Result<T, STTError>;

/// Provider-independent speech-to-text settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct STTConfig {
    pub api_key: String,
    pub model: String,
    /// Format of the caller audio that will be streamed.
    pub audio_format: AudioFormat,
    #[serde(default)]
    pub language: Option<String>,
}

/// A finalized piece of recognized speech with no guaranteed sentence boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    pub text: String,
}

impl TranscriptFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Streaming speech-to-text connection for one call.
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Open the stream. Fragments are delivered on `fragments` until
    /// [`disconnect`](BaseSTT::disconnect) or the remote closes.
    async fn connect(&mut self, fragments: mpsc::Sender<TranscriptFragment>) -> STTResult<()>;

    /// Forward one chunk of caller audio.
    async fn send_audio(&mut self, audio: Bytes) -> STTResult<()>;

    /// Close the stream. Safe to call more than once.
    async fn disconnect(&mut self) -> STTResult<()>;

    fn is_ready(&self) -> bool;

    /// Format the provider expects for [`send_audio`](BaseSTT::send_audio).
    fn audio_format(&self) -> AudioFormat;

    fn provider_name(&self) -> &'static str;
}
