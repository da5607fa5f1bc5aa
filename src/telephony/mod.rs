//! Telephony legs: outbound call initiation and media-stream codecs.
//!
//! Each caller service contributes two pieces:
//! - a [`CallInitiator`] that asks the provider to dial a number and connect the
//!   answered call to one of our stream endpoints
//! - a [`MediaCodec`] mapping its WebSocket frames onto [`LegEvent`] / [`LegMessage`]
//!
//! [`LegEvent`]: crate::core::session::LegEvent
//! [`LegMessage`]: crate::core::session::LegMessage

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::core::llm::LLMBackend;
use crate::core::session::{LegEvent, LegMessage, SessionMode};

pub mod twilio;
pub mod vonage;

pub use twilio::{TwilioClient, TwilioMediaCodec};
pub use vonage::{VonageClient, VonageMediaCodec};

pub const TWILIO_API_URL: &str = "https://api.twilio.com";
pub const VONAGE_API_URL: &str = "https://api.nexmo.com";

pub const TWILIO_MANAGED_PATH: &str = "/custom-stream";
pub const TWILIO_DELEGATED_PATH: &str = "/elevenlabs-stream";
pub const VONAGE_MANAGED_PATH: &str = "/vonage-custom-stream";
pub const VONAGE_DELEGATED_PATH: &str = "/vonage-elevenlabs-stream";

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("{0} is not configured: {1}")]
    NotConfigured(CallerService, String),
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

pub type TelephonyResult<T> = Result<T, TelephonyError>;

/// Telephony provider that places the outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerService {
    Twilio,
    Vonage,
}

impl CallerService {
    pub const fn as_str(self) -> &'static str {
        match self {
            CallerService::Twilio => "twilio",
            CallerService::Vonage => "vonage",
        }
    }

    /// WebSocket path the provider should stream the answered call to.
    pub const fn stream_path(self, pipeline: Pipeline) -> &'static str {
        match (self, pipeline) {
            (CallerService::Twilio, Pipeline::NewCustom) => TWILIO_MANAGED_PATH,
            (CallerService::Twilio, Pipeline::ElevenLabs) => TWILIO_DELEGATED_PATH,
            (CallerService::Vonage, Pipeline::NewCustom) => VONAGE_MANAGED_PATH,
            (CallerService::Vonage, Pipeline::ElevenLabs) => VONAGE_DELEGATED_PATH,
        }
    }
}

impl fmt::Display for CallerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallerService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twilio" => Ok(CallerService::Twilio),
            "vonage" => Ok(CallerService::Vonage),
            other => Err(other.to_string()),
        }
    }
}

/// Conversation pipeline the answered call is connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pipeline {
    /// Our own STT -> LLM -> TTS loop.
    #[serde(rename = "new_custom")]
    NewCustom,
    /// Audio relayed to an ElevenLabs conversational agent.
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
}

impl Pipeline {
    pub const fn as_str(self) -> &'static str {
        match self {
            Pipeline::NewCustom => "new_custom",
            Pipeline::ElevenLabs => "elevenlabs",
        }
    }

    pub const fn mode(self) -> SessionMode {
        match self {
            Pipeline::NewCustom => SessionMode::Managed,
            Pipeline::ElevenLabs => SessionMode::Delegated,
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_custom" => Ok(Pipeline::NewCustom),
            "elevenlabs" => Ok(Pipeline::ElevenLabs),
            other => Err(other.to_string()),
        }
    }
}

/// A validated request to dial out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// E.164 destination, already normalized.
    pub to_number: String,
    pub pipeline: Pipeline,
    /// Only meaningful for [`Pipeline::NewCustom`].
    pub llm: Option<LLMBackend>,
}

impl CallRequest {
    /// Backend advertised to the stream endpoint for managed calls.
    pub fn stream_llm(&self) -> LLMBackend {
        self.llm.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedCall {
    /// Provider call identifier (Twilio call SID, Vonage call UUID).
    pub call_id: String,
}

#[async_trait]
pub trait CallInitiator: Send + Sync {
    /// Place the call. Not retried on failure.
    async fn initiate(&self, request: &CallRequest) -> TelephonyResult<InitiatedCall>;

    fn service(&self) -> CallerService;
}

/// One WebSocket data frame, independent of the server framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Bytes),
}

/// Translates a provider's media-stream frames to and from leg events.
pub trait MediaCodec: Send {
    /// `None` for frames that carry nothing the session acts on.
    fn decode(&mut self, frame: WireFrame) -> Option<LegEvent>;

    /// `None` when the provider has no equivalent of the message.
    fn encode(&self, message: &LegMessage) -> Option<WireFrame>;
}

/// `wss://` URL of a stream endpoint on the public host.
pub(crate) fn stream_url(public_host: &str, service: CallerService, pipeline: Pipeline) -> String {
    format!("wss://{}{}", public_host, service.stream_path(pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerations_parse_exact_values() {
        assert_eq!("twilio".parse::<CallerService>(), Ok(CallerService::Twilio));
        assert_eq!("vonage".parse::<CallerService>(), Ok(CallerService::Vonage));
        assert!("Twilio".parse::<CallerService>().is_err());
        assert!("plivo".parse::<CallerService>().is_err());

        assert_eq!("new_custom".parse::<Pipeline>(), Ok(Pipeline::NewCustom));
        assert_eq!("elevenlabs".parse::<Pipeline>(), Ok(Pipeline::ElevenLabs));
        assert!("custom".parse::<Pipeline>().is_err());
    }

    #[test]
    fn test_pipeline_selects_session_mode() {
        assert_eq!(Pipeline::NewCustom.mode(), SessionMode::Managed);
        assert_eq!(Pipeline::ElevenLabs.mode(), SessionMode::Delegated);
    }

    #[test]
    fn test_stream_urls() {
        assert_eq!(
            stream_url("voice.example.com", CallerService::Twilio, Pipeline::NewCustom),
            "wss://voice.example.com/custom-stream"
        );
        assert_eq!(
            stream_url("voice.example.com", CallerService::Vonage, Pipeline::ElevenLabs),
            "wss://voice.example.com/vonage-elevenlabs-stream"
        );
    }

    #[test]
    fn test_stream_llm_defaults_to_mistral() {
        let request = CallRequest {
            to_number: "+14155550100".to_string(),
            pipeline: Pipeline::NewCustom,
            llm: None,
        };
        assert_eq!(request.stream_llm(), LLMBackend::Mistral);
    }
}
