//! Google Cloud Text-to-Speech (REST).
//!
//! - Endpoint: `POST https://texttospeech.googleapis.com/v1/text:synthesize?key=<API_KEY>`
//! - Output: `audioContent`, base64; LINEAR16 responses carry a WAV header

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::base::{BaseTTS, SynthesizedAudio, TTSConfig, TTSError, TTSResult};
use crate::core::audio::AudioEncoding;

pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com";
pub const DEFAULT_GOOGLE_VOICE: &str = "en-US-Wavenet-D";
pub const DEFAULT_GOOGLE_LANGUAGE: &str = "en-US";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

pub struct GoogleTTS {
    client: reqwest::Client,
    config: TTSConfig,
}

impl GoogleTTS {
    pub fn new(client: reqwest::Client, config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "Google TTS API key is required".to_string(),
            ));
        }
        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        let base = self.config.endpoint.as_deref().unwrap_or(GOOGLE_TTS_URL);
        format!("{}/v1/text:synthesize", base.trim_end_matches('/'))
    }

    fn audio_encoding(&self) -> &'static str {
        match self.config.output_format.encoding {
            AudioEncoding::Mulaw => "MULAW",
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }
}

#[async_trait]
impl BaseTTS for GoogleTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<SynthesizedAudio> {
        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": self.config.language,
                "name": self.config.voice,
            },
            "audioConfig": {
                "audioEncoding": self.audio_encoding(),
                "sampleRateHertz": self.config.output_format.sample_rate,
            },
        });

        let response = self
            .client
            .post(self.synthesize_url())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TTSError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }

        let payload: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| TTSError::AudioGenerationFailed(format!("Invalid response: {e}")))?;
        let data = BASE64_STANDARD
            .decode(payload.audio_content.as_bytes())
            .map_err(|e| TTSError::AudioGenerationFailed(format!("Invalid audio content: {e}")))?;
        if data.is_empty() {
            return Err(TTSError::AudioGenerationFailed(
                "Empty audio content".to_string(),
            ));
        }

        debug!(bytes = data.len(), chars = text.len(), "Google TTS synthesized");
        Ok(SynthesizedAudio {
            data: Bytes::from(data),
            format: self.config.output_format,
        })
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}
