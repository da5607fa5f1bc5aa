//! Call sessions: one per telephony leg.
//!
//! A [`CallSession`] consumes provider-neutral [`LegEvent`]s and writes
//! [`LegMessage`]s back. Depending on [`SessionMode`] it runs the managed
//! pipeline (speech-to-text, text generation, synthesis) or relays to a hosted
//! agent. Either way, outgoing speech goes through one playback sequencer and
//! the audio pacer.

mod call;
mod delegated;
mod leg;
mod managed;
mod state;


use thiserror::Error;

use crate::core::agent::AgentError;
use crate::core::audio::AudioError;
use crate::core::llm::LLMError;
use crate::core::stt::STTError;
use crate::core::tts::TTSError;

pub use call::{CallSession, SessionMode, SessionSettings};
pub use leg::{EgressSink, LegEvent, LegMessage};
pub use state::{CallState, StateTracker};

/// Failures that end a session.
///
/// Errors during the call itself (a failed synthesis, a dropped audio frame)
/// are logged and skipped; only opening or closing the services surfaces here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Speech-to-text error: {0}")]
    Stt(#[from] STTError),

    #[error("Text generation error: {0}")]
    Llm(#[from] LLMError),

    #[error("Speech synthesis error: {0}")]
    Tts(#[from] TTSError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}

pub type SessionResult<T> = Result<T, SessionError>;
