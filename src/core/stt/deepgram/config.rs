//! Deepgram live transcription configuration.

use std::time::Duration;

use url::Url;

use crate::core::audio::AudioFormat;
use crate::core::stt::base::{STTConfig, STTError, STTResult};

/// Deepgram live streaming endpoint.
pub const DEEPGRAM_LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Model tuned for narrow-band phone audio.
pub const DEFAULT_DEEPGRAM_MODEL: &str = "nova-2-phonecall";

/// Deepgram closes a stream after about 10 s without audio.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DeepgramSTTConfig {
    pub base: STTConfig,
    /// Endpoint override, used to point the client at a local server.
    pub endpoint: String,
    /// Silence after which a `KeepAlive` is sent.
    pub keepalive_interval: Duration,
}

impl DeepgramSTTConfig {
    pub fn new(base: STTConfig) -> Self {
        Self {
            base,
            endpoint: DEEPGRAM_LISTEN_URL.to_string(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn audio_format(&self) -> AudioFormat {
        self.base.audio_format
    }

    /// Build the listen URL with encoding, sample rate and model query params.
    pub fn build_websocket_url(&self) -> STTResult<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| STTError::ConfigurationError(format!("Invalid Deepgram URL: {e}")))?;

        let model = if self.base.model.is_empty() {
            DEFAULT_DEEPGRAM_MODEL
        } else {
            self.base.model.as_str()
        };

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("encoding", self.base.audio_format.encoding.as_str())
                .append_pair(
                    "sample_rate",
                    &self.base.audio_format.sample_rate.to_string(),
                )
                .append_pair("channels", "1")
                .append_pair("model", model);
            if let Some(language) = &self.base.language {
                query.append_pair("language", language);
            }
        }

        Ok(url)
    }
}
