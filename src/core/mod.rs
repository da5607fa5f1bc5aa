pub mod agent;
pub mod audio;
pub mod conversation;
pub mod llm;
pub mod providers;
pub mod session;
pub mod stt;
pub mod tts;

// Re-export commonly used types for convenience
pub use agent::{AgentError, AgentEvent, BaseAgent, ElevenLabsAgent};
pub use audio::{AudioEncoding, AudioError, AudioFormat, AudioPacer, FrameSink, transcode};
pub use conversation::{PlaybackItem, PlaybackOutcome, PlaybackSequencer, TranscriptAggregator};
pub use llm::{BaseLLM, LLMBackend, LLMError, SentenceUnit, create_llm};
pub use providers::{ConfiguredProviders, ProviderFactory};
pub use session::{CallSession, CallState, LegEvent, LegMessage, SessionError, SessionMode};
pub use stt::{BaseSTT, DeepgramSTT, STTError, create_stt_provider};
pub use tts::{BaseTTS, GoogleTTS, TTSError, create_tts_provider};
