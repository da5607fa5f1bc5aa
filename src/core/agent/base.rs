//! Base traits and types for hosted conversational agents.
//!
//! A hosted agent performs recognition, generation and synthesis on its own
//! side. The call only relays caller audio in and agent audio out, plus the
//! agent's barge-in and keepalive signals.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::audio::AudioFormat;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not connected")]
    NotConnected,
}

pub type AgentResult<T> = Result<T, AgentError>;

// =============================================================================
// Connection State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Signals received from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Conversation accepted by the agent.
    Started { conversation_id: Option<String> },
    /// Synthesized agent speech in the agent's output format.
    Audio(Bytes),
    /// Caller barged in; queued agent audio must be dropped.
    Interruption,
    /// Keepalive that must be answered with a pong carrying the same id.
    Ping { event_id: u64 },
    /// Text of what the agent said.
    AgentResponse(String),
    /// Text of what the caller said.
    UserTranscript(String),
}

// =============================================================================
// Agent Trait
// =============================================================================

#[async_trait]
pub trait BaseAgent: Send + Sync {
    /// Open the agent socket and declare audio formats. Events are delivered on
    /// `events` until disconnected.
    async fn connect(&mut self, events: mpsc::Sender<AgentEvent>) -> AgentResult<()>;

    /// Forward caller audio, already in [`audio_format`](BaseAgent::audio_format).
    async fn send_audio(&mut self, audio: Bytes) -> AgentResult<()>;

    async fn send_pong(&mut self, event_id: u64) -> AgentResult<()>;

    async fn disconnect(&mut self) -> AgentResult<()>;

    fn is_ready(&self) -> bool;

    fn connection_state(&self) -> ConnectionState;

    /// Format of audio in both directions.
    fn audio_format(&self) -> AudioFormat;

    fn provider_name(&self) -> &'static str;
}
