//! Applies YAML overrides on top of the environment configuration.

use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig, env};

/// Load the environment configuration and overlay `yaml` when given.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        override_with(&mut config.host, server.host);
        override_with(&mut config.port, server.port);
        override_opt(&mut config.server_url, server.public_url);

        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                _ => {
                    if let (Some(cert), Some(key)) = (tls.cert_path, tls.key_path) {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    } else if tls.enabled == Some(true) && config.tls.is_none() {
                        return Err("TLS enabled in YAML but cert_path/key_path missing".into());
                    }
                }
            }
        }
    }

    if let Some(telephony) = yaml.telephony {
        if let Some(twilio) = telephony.twilio {
            override_opt(&mut config.twilio_account_sid, twilio.account_sid);
            override_opt(&mut config.twilio_auth_token, twilio.auth_token);
            override_opt(&mut config.twilio_from_number, twilio.from_number);
            override_with(&mut config.twilio_api_url, twilio.api_url);
        }
        if let Some(vonage) = telephony.vonage {
            override_opt(&mut config.vonage_application_id, vonage.application_id);
            override_opt(
                &mut config.vonage_private_key_path,
                vonage.private_key_path.map(PathBuf::from),
            );
            override_opt(&mut config.vonage_from_number, vonage.from_number);
            override_with(&mut config.vonage_api_url, vonage.api_url);
        }
    }

    if let Some(providers) = yaml.providers {
        override_opt(&mut config.deepgram_api_key, providers.deepgram_api_key);
        override_with(&mut config.deepgram_model, providers.deepgram_model);
        override_opt(&mut config.deepgram_url, providers.deepgram_url);
        override_opt(&mut config.openai_api_key, providers.openai_api_key);
        override_with(&mut config.openai_model, providers.openai_model);
        override_opt(&mut config.openai_url, providers.openai_url);
        override_with(&mut config.ollama_url, providers.ollama_url);
        override_with(&mut config.mistral_model, providers.mistral_model);
        override_opt(&mut config.google_tts_api_key, providers.google_tts_api_key);
        override_with(&mut config.google_tts_voice, providers.google_tts_voice);
        override_with(&mut config.google_tts_language, providers.google_tts_language);
        override_opt(&mut config.google_tts_url, providers.google_tts_url);
        override_opt(&mut config.elevenlabs_api_key, providers.elevenlabs_api_key);
        override_opt(&mut config.elevenlabs_agent_id, providers.elevenlabs_agent_id);
        override_opt(&mut config.elevenlabs_url, providers.elevenlabs_url);
    }

    if let Some(conversation) = yaml.conversation {
        override_with(&mut config.debounce_ms, conversation.debounce_ms);
        override_with(&mut config.frame_ms, conversation.frame_ms);
        override_with(&mut config.greeting, conversation.greeting);
        override_with(&mut config.system_prompt, conversation.system_prompt);
    }

    if let Some(security) = yaml.security {
        override_opt(
            &mut config.cors_allowed_origins,
            security.cors_allowed_origins,
        );
        override_with(
            &mut config.rate_limit_requests_per_second,
            security.rate_limit_requests_per_second,
        );
        override_with(
            &mut config.rate_limit_burst_size,
            security.rate_limit_burst_size,
        );
    }

    Ok(config)
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn override_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}
