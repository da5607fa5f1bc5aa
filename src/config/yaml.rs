use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_url: "calls.example.com"
///
/// telephony:
///   twilio:
///     account_sid: "AC..."
///     auth_token: "your-auth-token"
///     from_number: "+15550001111"
///   vonage:
///     application_id: "app-id"
///     private_key_path: "/etc/voxcall/vonage.key"
///     from_number: "15550001111"
///
/// providers:
///   deepgram_api_key: "your-deepgram-key"
///   openai_api_key: "your-openai-key"
///   openai_model: "gpt-4o-mini"
///   ollama_url: "http://localhost:11434"
///   google_tts_api_key: "your-google-key"
///   elevenlabs_api_key: "your-elevenlabs-key"
///   elevenlabs_agent_id: "agent-id"
///
/// conversation:
///   debounce_ms: 1200
///   frame_ms: 20
///   greeting: "Hi, how can I help you today?"
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub telephony: Option<TelephonyYaml>,
    pub providers: Option<ProvidersYaml>,
    pub conversation: Option<ConversationYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Public host name used in dial instructions
    pub public_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Telephony provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TelephonyYaml {
    pub twilio: Option<TwilioYaml>,
    pub vonage: Option<VonageYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VonageYaml {
    pub application_id: Option<String>,
    pub private_key_path: Option<String>,
    pub from_number: Option<String>,
    pub api_url: Option<String>,
}

/// AI service settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub deepgram_api_key: Option<String>,
    pub deepgram_model: Option<String>,
    pub deepgram_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_url: Option<String>,
    /// Ollama server hosting the mistral backend
    pub ollama_url: Option<String>,
    pub mistral_model: Option<String>,
    pub google_tts_api_key: Option<String>,
    pub google_tts_voice: Option<String>,
    pub google_tts_language: Option<String>,
    pub google_tts_url: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_url: Option<String>,
}

/// Turn-taking and playback settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationYaml {
    /// Silence that finalizes an utterance (milliseconds)
    pub debounce_ms: Option<u64>,
    /// Egress frame duration (milliseconds)
    pub frame_ms: Option<u64>,
    pub greeting: Option<String>,
    pub system_prompt: Option<String>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "0.0.0.0"
  port: 3000
  public_url: "calls.example.com"
  tls:
    enabled: true
    cert_path: "/certs/cert.pem"
    key_path: "/certs/key.pem"

telephony:
  twilio:
    account_sid: "AC123"
    auth_token: "token"
    from_number: "+15550001111"
  vonage:
    application_id: "app"
    private_key_path: "/keys/vonage.key"
    from_number: "15550001111"

providers:
  deepgram_api_key: "dg"
  openai_api_key: "oa"
  openai_model: "gpt-4o"
  ollama_url: "http://ollama:11434"
  google_tts_voice: "en-GB-Wavenet-A"
  elevenlabs_agent_id: "agent"

conversation:
  debounce_ms: 900
  frame_ms: 40
  greeting: "Hello!"

security:
  cors_allowed_origins: "*"
  rate_limit_requests_per_second: 5
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(3000));
        assert_eq!(server.public_url.as_deref(), Some("calls.example.com"));
        assert_eq!(server.tls.unwrap().enabled, Some(true));

        let telephony = config.telephony.unwrap();
        assert_eq!(
            telephony.twilio.unwrap().account_sid.as_deref(),
            Some("AC123")
        );
        assert_eq!(
            telephony.vonage.unwrap().private_key_path.as_deref(),
            Some("/keys/vonage.key")
        );

        let providers = config.providers.unwrap();
        assert_eq!(providers.openai_model.as_deref(), Some("gpt-4o"));
        assert_eq!(providers.google_tts_voice.as_deref(), Some("en-GB-Wavenet-A"));
        assert!(providers.google_tts_api_key.is_none());

        let conversation = config.conversation.unwrap();
        assert_eq!(conversation.debounce_ms, Some(900));
        assert_eq!(conversation.frame_ms, Some(40));
        assert!(conversation.system_prompt.is_none());

        let security = config.security.unwrap();
        assert_eq!(security.rate_limit_requests_per_second, Some(5));
        assert!(security.rate_limit_burst_size.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.telephony.is_none());
        assert!(config.providers.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(
            &config_path,
            r#"
server:
  host: "localhost"
  port: 3000
"#,
        )
        .unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.host, Some("localhost".to_string()));
        assert_eq!(server.port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
