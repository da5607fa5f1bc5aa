//! Per-call construction of AI service clients.
//!
//! A [`CallSession`](crate::core::session::CallSession) never builds providers
//! itself; it asks a [`ProviderFactory`] for fresh, unconnected instances when
//! the leg starts. The server uses [`ConfiguredProviders`], tests substitute
//! their own factory.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::agent::{
    AgentError, AgentResult, BaseAgent, ElevenLabsAgent, ElevenLabsAgentConfig,
};
use crate::core::audio::AudioFormat;
use crate::core::llm::{BaseLLM, LLMBackend, LLMConfig, LLMResult, OPENAI_API_URL, create_llm};
use crate::core::stt::{
    BaseSTT, DeepgramSTT, DeepgramSTTConfig, STTConfig, STTError, STTResult, create_stt_provider,
};
use crate::core::tts::{BaseTTS, TTSConfig, TTSError, TTSResult, create_tts_provider};

pub trait ProviderFactory: Send + Sync {
    /// Speech-to-text fed with audio in `audio_format`.
    fn create_stt(&self, audio_format: AudioFormat) -> STTResult<Box<dyn BaseSTT>>;

    fn create_llm(&self, backend: LLMBackend) -> LLMResult<Box<dyn BaseLLM>>;

    /// Speech synthesis producing `output_format`.
    fn create_tts(&self, output_format: AudioFormat) -> TTSResult<Box<dyn BaseTTS>>;

    fn create_agent(&self) -> AgentResult<Box<dyn BaseAgent>>;
}

/// Builds the production providers from server configuration.
///
/// One `reqwest::Client` is shared by every call so HTTP connections to the
/// generation and synthesis services are pooled.
pub struct ConfiguredProviders {
    config: Arc<ServerConfig>,
    http: reqwest::Client,
}

impl ConfiguredProviders {
    pub fn new(config: Arc<ServerConfig>, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

impl ProviderFactory for ConfiguredProviders {
    fn create_stt(&self, audio_format: AudioFormat) -> STTResult<Box<dyn BaseSTT>> {
        let api_key = self.config.deepgram_api_key.clone().ok_or_else(|| {
            STTError::ConfigurationError("DEEPGRAM_API_KEY is not configured".to_string())
        })?;
        let config = STTConfig {
            api_key,
            model: self.config.deepgram_model.clone(),
            audio_format,
            language: None,
        };
        match &self.config.deepgram_url {
            Some(endpoint) => Ok(Box::new(DeepgramSTT::new(
                DeepgramSTTConfig::new(config).with_endpoint(endpoint),
            )?)),
            None => create_stt_provider("deepgram", config),
        }
    }

    fn create_llm(&self, backend: LLMBackend) -> LLMResult<Box<dyn BaseLLM>> {
        let config = match backend {
            LLMBackend::Mistral => LLMConfig {
                base_url: self.config.ollama_url.clone(),
                model: self.config.mistral_model.clone(),
                api_key: None,
                system_prompt: self.config.system_prompt.clone(),
            },
            LLMBackend::OpenAI => LLMConfig {
                base_url: self
                    .config
                    .openai_url
                    .clone()
                    .unwrap_or_else(|| OPENAI_API_URL.to_string()),
                model: self.config.openai_model.clone(),
                api_key: self.config.openai_api_key.clone(),
                system_prompt: self.config.system_prompt.clone(),
            },
        };
        create_llm(backend, self.http.clone(), config)
    }

    fn create_tts(&self, output_format: AudioFormat) -> TTSResult<Box<dyn BaseTTS>> {
        let api_key = self.config.google_tts_api_key.clone().ok_or_else(|| {
            TTSError::InvalidConfiguration("GOOGLE_TTS_API_KEY is not configured".to_string())
        })?;
        let config = TTSConfig {
            api_key,
            voice: self.config.google_tts_voice.clone(),
            language: self.config.google_tts_language.clone(),
            output_format,
            endpoint: self.config.google_tts_url.clone(),
        };
        create_tts_provider("google", self.http.clone(), config)
    }

    fn create_agent(&self) -> AgentResult<Box<dyn BaseAgent>> {
        let (Some(api_key), Some(agent_id)) = (
            self.config.elevenlabs_api_key.as_deref(),
            self.config.elevenlabs_agent_id.as_deref(),
        ) else {
            return Err(AgentError::InvalidConfiguration(
                "ELEVENLABS_API_KEY and ELEVENLABS_AGENT_ID must be configured".to_string(),
            ));
        };
        let mut config = ElevenLabsAgentConfig::new(api_key, agent_id);
        if let Some(api_base) = &self.config.elevenlabs_url {
            config.api_base = api_base.clone();
        }
        Ok(Box::new(ElevenLabsAgent::new(self.http.clone(), config)?))
    }
}
