//! ElevenLabs Conversational AI configuration.

use crate::core::agent::base::{AgentError, AgentResult};
use crate::core::audio::{AudioEncoding, AudioFormat};

pub const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io";

#[derive(Debug, Clone)]
pub struct ElevenLabsAgentConfig {
    pub api_key: String,
    pub agent_id: String,
    /// Format used for both caller input and agent output.
    pub audio_format: AudioFormat,
    /// REST base used for the signed URL lookup.
    pub api_base: String,
}

impl ElevenLabsAgentConfig {
    pub fn new(api_key: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            agent_id: agent_id.into(),
            audio_format: AudioFormat::mulaw_8k(),
            api_base: ELEVENLABS_API_URL.to_string(),
        }
    }

    pub fn signed_url_endpoint(&self) -> String {
        format!(
            "{}/v1/convai/conversation/get_signed_url",
            self.api_base.trim_end_matches('/')
        )
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.api_key.is_empty() {
            return Err(AgentError::AuthenticationFailed(
                "ElevenLabs API key is required".to_string(),
            ));
        }
        if self.agent_id.is_empty() {
            return Err(AgentError::InvalidConfiguration(
                "ElevenLabs agent ID is required".to_string(),
            ));
        }
        format_name(self.audio_format).map(|_| ())
    }
}

/// ElevenLabs audio format identifier, e.g. `ulaw_8000` or `pcm_16000`.
pub fn format_name(format: AudioFormat) -> AgentResult<String> {
    match (format.encoding, format.sample_rate) {
        (AudioEncoding::Mulaw, 8000) => Ok("ulaw_8000".to_string()),
        (AudioEncoding::Linear16, rate @ (8000 | 16000 | 22050 | 24000 | 44100)) => {
            Ok(format!("pcm_{rate}"))
        }
        _ => Err(AgentError::InvalidConfiguration(format!(
            "Unsupported ElevenLabs audio format: {format}"
        ))),
    }
}
