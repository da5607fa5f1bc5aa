//! ElevenLabs Conversational AI WebSocket messages.

use serde::{Deserialize, Serialize};

// =============================================================================
// Client Events
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    ConversationInitiationClientData {
        conversation_config_override: ConversationConfigOverride,
    },
    Pong {
        event_id: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationConfigOverride {
    pub agent: AgentAudioOverride,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentAudioOverride {
    pub agent_output_audio_format: String,
    pub user_input_audio_format: String,
}

impl ClientEvent {
    pub fn initiation(audio_format: &str) -> Self {
        ClientEvent::ConversationInitiationClientData {
            conversation_config_override: ConversationConfigOverride {
                agent: AgentAudioOverride {
                    agent_output_audio_format: audio_format.to_string(),
                    user_input_audio_format: audio_format.to_string(),
                },
            },
        }
    }
}

/// Caller audio chunk. This message carries no `type` field.
#[derive(Debug, Clone, Serialize)]
pub struct UserAudioChunk {
    pub user_audio_chunk: String,
}

// =============================================================================
// Server Events
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ConversationInitiationMetadata {
        conversation_initiation_metadata_event: InitiationMetadata,
    },
    Audio {
        audio_event: AudioEvent,
    },
    Interruption {
        #[serde(default)]
        interruption_event: Option<EventRef>,
    },
    Ping {
        ping_event: PingEvent,
    },
    AgentResponse {
        agent_response_event: AgentResponseEvent,
    },
    UserTranscript {
        user_transcription_event: UserTranscriptionEvent,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiationMetadata {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub agent_output_audio_format: Option<String>,
    #[serde(default)]
    pub user_input_audio_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioEvent {
    pub audio_base_64: String,
    #[serde(default)]
    pub event_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRef {
    #[serde(default)]
    pub event_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingEvent {
    pub event_id: u64,
    #[serde(default)]
    pub ping_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentResponseEvent {
    #[serde(default)]
    pub agent_response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserTranscriptionEvent {
    #[serde(default)]
    pub user_transcript: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrlResponse {
    pub signed_url: String,
}
