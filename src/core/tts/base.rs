//! Base trait and types for speech synthesis.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::core::audio::AudioFormat;

#[derive(Debug, Error)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error ({status}): {body}")]
    ProviderError { status: u16, body: String },

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

#[derive(Debug, Clone)]
pub struct TTSConfig {
    pub api_key: String,
    pub voice: String,
    pub language: String,
    /// Format requested from the service.
    pub output_format: AudioFormat,
    /// Service endpoint override.
    pub endpoint: Option<String>,
}

/// One complete synthesized buffer.
///
/// `data` may still be wrapped in a RIFF/WAV container; `format` describes
/// the samples as requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    pub format: AudioFormat,
}

/// Text-to-speech, one request per sentence unit.
#[async_trait]
pub trait BaseTTS: Send + Sync {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio>;

    fn provider_name(&self) -> &'static str;
}
