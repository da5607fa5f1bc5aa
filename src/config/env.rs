//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ServerConfig, TlsConfig};

/// Read an optional variable, treating empty values as unset.
pub(super) fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub(super) fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional variable, reporting the key on malformed input.
pub(super) fn env_parse<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid value for {key}: {e}").into()),
        None => Ok(default),
    }
}

/// Build a configuration from environment variables and config.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let tls = match (env_opt("TLS_CERT_PATH"), env_opt("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => {
            return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into());
        }
    };

    let mut config = ServerConfig::default();
    config.host = env_or("HOST", &config.host);
    config.port = env_parse("PORT", config.port)?;
    config.tls = tls;
    config.server_url = env_opt("SERVER_URL");

    config.twilio_account_sid = env_opt("TWILIO_ACCOUNT_SID");
    config.twilio_auth_token = env_opt("TWILIO_AUTH_TOKEN");
    config.twilio_from_number = env_opt("TWILIO_FROM_NUMBER");
    config.twilio_api_url = env_or("TWILIO_API_URL", &config.twilio_api_url);
    config.vonage_application_id = env_opt("VONAGE_APPLICATION_ID");
    config.vonage_private_key_path = env_opt("VONAGE_PRIVATE_KEY_PATH").map(PathBuf::from);
    config.vonage_from_number = env_opt("VONAGE_FROM_NUMBER");
    config.vonage_api_url = env_or("VONAGE_API_URL", &config.vonage_api_url);

    config.deepgram_api_key = env_opt("DEEPGRAM_API_KEY");
    config.deepgram_model = env_or("DEEPGRAM_MODEL", &config.deepgram_model);
    config.deepgram_url = env_opt("DEEPGRAM_URL");
    config.openai_api_key = env_opt("OPENAI_API_KEY");
    config.openai_model = env_or("OPENAI_MODEL", &config.openai_model);
    config.openai_url = env_opt("OPENAI_URL");
    config.ollama_url = env_or("OLLAMA_URL", &config.ollama_url);
    config.mistral_model = env_or("MISTRAL_MODEL", &config.mistral_model);
    config.google_tts_api_key = env_opt("GOOGLE_TTS_API_KEY");
    config.google_tts_voice = env_or("GOOGLE_TTS_VOICE", &config.google_tts_voice);
    config.google_tts_language = env_or("GOOGLE_TTS_LANGUAGE", &config.google_tts_language);
    config.google_tts_url = env_opt("GOOGLE_TTS_URL");
    config.elevenlabs_api_key = env_opt("ELEVENLABS_API_KEY");
    config.elevenlabs_agent_id = env_opt("ELEVENLABS_AGENT_ID");
    config.elevenlabs_url = env_opt("ELEVENLABS_URL");

    config.debounce_ms = env_parse("DEBOUNCE_MS", config.debounce_ms)?;
    config.frame_ms = env_parse("FRAME_MS", config.frame_ms)?;
    config.greeting = env_or("GREETING", &config.greeting);
    config.system_prompt = env_or("SYSTEM_PROMPT", &config.system_prompt);

    config.cors_allowed_origins = env_opt("CORS_ALLOWED_ORIGINS");
    config.rate_limit_requests_per_second = env_parse(
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        config.rate_limit_requests_per_second,
    )?;
    config.rate_limit_burst_size =
        env_parse("RATE_LIMIT_BURST_SIZE", config.rate_limit_burst_size)?;

    Ok(config)
}
