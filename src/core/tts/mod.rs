mod base;
pub mod google;

pub use base::{BaseTTS, SynthesizedAudio, TTSConfig, TTSError, TTSResult};
pub use google::{DEFAULT_GOOGLE_LANGUAGE, DEFAULT_GOOGLE_VOICE, GOOGLE_TTS_URL, GoogleTTS};

/// Create a TTS provider by name.
pub fn create_tts_provider(
    provider_type: &str,
    client: reqwest::Client,
    config: TTSConfig,
) -> TTSResult<Box<dyn BaseTTS>> {
    match provider_type.to_lowercase().as_str() {
        "google" => Ok(Box::new(GoogleTTS::new(client, config)?)),
        _ => Err(TTSError::InvalidConfiguration(format!(
            "Unsupported TTS provider: {provider_type}. Supported providers: google"
        ))),
    }
}
