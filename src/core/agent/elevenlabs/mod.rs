mod client;
mod config;
mod messages;

pub use client::ElevenLabsAgent;
pub use config::{ELEVENLABS_API_URL, ElevenLabsAgentConfig, format_name};
pub use messages::{ClientEvent, ServerEvent, UserAudioChunk};
