//! Hosted conversational agents for delegated calls.

mod base;
pub mod elevenlabs;

pub use base::{AgentError, AgentEvent, AgentResult, BaseAgent, ConnectionState};
pub use elevenlabs::{ElevenLabsAgent, ElevenLabsAgentConfig};
