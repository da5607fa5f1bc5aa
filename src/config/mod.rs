//! Configuration module for the voxcall gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voxcall_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

use crate::core::llm::{DEFAULT_MISTRAL_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_MODEL};
use crate::core::stt::deepgram::DEFAULT_DEEPGRAM_MODEL;
use crate::core::tts::{DEFAULT_GOOGLE_LANGUAGE, DEFAULT_GOOGLE_VOICE};
use crate::telephony::{TWILIO_API_URL, VONAGE_API_URL};

/// Spoken as soon as a managed call starts.
pub const DEFAULT_GREETING: &str =
    "Hi, thanks for taking my call. How's everything going today?";

/// Persona sent as the system message of every reply request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly phone assistant. \
Keep every answer short and conversational, one or two sentences. \
Never use lists, markdown or emojis because your words are spoken aloud. \
Do not repeat your greeting.";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS, public URL)
/// - Telephony credentials (Twilio, Vonage)
/// - AI service settings (Deepgram, OpenAI/Ollama, Google TTS, ElevenLabs)
/// - Conversation timing (debounce, frame duration) and persona
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Public host the telephony providers connect back to (no scheme)
    pub server_url: Option<String>,

    // Twilio
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    pub twilio_api_url: String,

    // Vonage
    pub vonage_application_id: Option<String>,
    /// RS256 private key used to sign application JWTs
    pub vonage_private_key_path: Option<PathBuf>,
    pub vonage_from_number: Option<String>,
    pub vonage_api_url: String,

    // Speech-to-text
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: String,
    /// Overrides the Deepgram listen endpoint
    pub deepgram_url: Option<String>,

    // Text generation
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_url: Option<String>,
    /// Ollama server hosting the mistral backend
    pub ollama_url: String,
    pub mistral_model: String,

    // Speech synthesis
    pub google_tts_api_key: Option<String>,
    pub google_tts_voice: String,
    pub google_tts_language: String,
    pub google_tts_url: Option<String>,

    // Delegated agent
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_url: Option<String>,

    // Conversation
    /// Silence that finalizes an utterance
    /// Default: 1200
    pub debounce_ms: u64,
    /// Duration of one egress audio frame
    /// Default: 20
    pub frame_ms: u64,
    pub greeting: String,
    pub system_prompt: String,

    // Security settings
    /// Allowed CORS origins: "*" or a comma-separated list
    /// Default: None (same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Rate limit for the HTTP API
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tls: None,
            server_url: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_from_number: None,
            twilio_api_url: TWILIO_API_URL.to_string(),
            vonage_application_id: None,
            vonage_private_key_path: None,
            vonage_from_number: None,
            vonage_api_url: VONAGE_API_URL.to_string(),
            deepgram_api_key: None,
            deepgram_model: DEFAULT_DEEPGRAM_MODEL.to_string(),
            deepgram_url: None,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_url: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            mistral_model: DEFAULT_MISTRAL_MODEL.to_string(),
            google_tts_api_key: None,
            google_tts_voice: DEFAULT_GOOGLE_VOICE.to_string(),
            google_tts_language: DEFAULT_GOOGLE_LANGUAGE.to_string(),
            google_tts_url: None,
            elevenlabs_api_key: None,
            elevenlabs_agent_id: None,
            elevenlabs_url: None,
            debounce_ms: 1200,
            frame_ms: 20,
            greeting: DEFAULT_GREETING.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        for secret in [
            &mut self.twilio_auth_token,
            &mut self.deepgram_api_key,
            &mut self.openai_api_key,
            &mut self.google_tts_api_key,
            &mut self.elevenlabs_api_key,
        ]
        .into_iter()
        .flatten()
        {
            secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults
    ///
    /// The .env file is loaded in main.rs before this is called.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_conversation(config)?;
        validation::validate_rate_limit(config)?;
        validation::validate_server_url(&config.server_url)?;
        validation::validate_tls(config)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Host used in `wss://` dial instructions.
    ///
    /// Falls back to the bind address when no public URL is configured.
    pub fn public_host(&self) -> String {
        self.server_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.address())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}
