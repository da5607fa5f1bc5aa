use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::audio::AudioFormat;
use crate::core::providers::{ConfiguredProviders, ProviderFactory};
use crate::core::session::{SessionMode, SessionSettings};
use crate::telephony::{
    CallInitiator, CallerService, TelephonyError, TelephonyResult, TwilioClient, VonageClient,
    twilio::TwilioConfig, vonage::VonageConfig,
};

/// Shared application state handed to every handler.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub providers: Arc<dyn ProviderFactory>,
    initiators: HashMap<CallerService, Arc<dyn CallInitiator>>,
    /// Why a caller service has no initiator, reported when a call asks for it.
    unavailable: HashMap<CallerService, String>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let config = Arc::new(config);
        let http = reqwest::Client::new();
        let providers: Arc<dyn ProviderFactory> =
            Arc::new(ConfiguredProviders::new(config.clone(), http.clone()));

        let mut initiators: HashMap<CallerService, Arc<dyn CallInitiator>> = HashMap::new();
        let mut unavailable = HashMap::new();

        match TwilioConfig::from_server_config(&config) {
            Ok(twilio) => {
                initiators.insert(
                    CallerService::Twilio,
                    Arc::new(TwilioClient::new(http.clone(), twilio)),
                );
            }
            Err(e) => {
                warn!("Twilio call initiation disabled: {e}");
                unavailable.insert(CallerService::Twilio, e.to_string());
            }
        }

        match VonageConfig::from_server_config(&config)
            .and_then(|vonage| VonageClient::new(http.clone(), vonage))
        {
            Ok(client) => {
                initiators.insert(CallerService::Vonage, Arc::new(client));
            }
            Err(e) => {
                warn!("Vonage call initiation disabled: {e}");
                unavailable.insert(CallerService::Vonage, e.to_string());
            }
        }

        info!(
            twilio = initiators.contains_key(&CallerService::Twilio),
            vonage = initiators.contains_key(&CallerService::Vonage),
            "Caller services initialized"
        );

        Arc::new(Self {
            config,
            providers,
            initiators,
            unavailable,
        })
    }

    /// State with explicitly supplied collaborators.
    pub fn with_components(
        config: ServerConfig,
        providers: Arc<dyn ProviderFactory>,
        initiators: Vec<Arc<dyn CallInitiator>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            providers,
            initiators: initiators
                .into_iter()
                .map(|initiator| (initiator.service(), initiator))
                .collect(),
            unavailable: HashMap::new(),
        })
    }

    pub fn initiator(&self, service: CallerService) -> TelephonyResult<Arc<dyn CallInitiator>> {
        if let Some(initiator) = self.initiators.get(&service) {
            return Ok(initiator.clone());
        }
        let reason = self
            .unavailable
            .get(&service)
            .cloned()
            .unwrap_or_else(|| "no credentials configured".to_string());
        Err(TelephonyError::NotConfigured(service, reason))
    }

    /// Session settings for a stream endpoint.
    pub fn session_settings(&self, mode: SessionMode, leg_format: AudioFormat) -> SessionSettings {
        let mut settings = SessionSettings::new(mode, leg_format);
        settings.frame_duration = self.config.frame_duration();
        settings.debounce = self.config.debounce();
        if mode == SessionMode::Managed && !self.config.greeting.trim().is_empty() {
            settings.greeting = Some(self.config.greeting.clone());
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unconfigured_services_report_reason() {
        let state = AppState::new(ServerConfig::default());
        let err = match state.initiator(CallerService::Twilio) {
            Err(e) => e,
            Ok(_) => panic!("Twilio should not be configured"),
        };
        assert!(err.to_string().contains("TWILIO_ACCOUNT_SID"));
        assert!(state.initiator(CallerService::Vonage).is_err());
    }

    #[test]
    fn test_configured_twilio_is_available() {
        let mut config = ServerConfig::default();
        config.twilio_account_sid = Some("AC1".into());
        config.twilio_auth_token = Some("token".into());
        config.twilio_from_number = Some("+15005550006".into());

        let state = AppState::new(config);
        let initiator = state.initiator(CallerService::Twilio).ok().unwrap();
        assert_eq!(initiator.service(), CallerService::Twilio);
    }

    #[test]
    fn test_session_settings_follow_config() {
        let mut config = ServerConfig::default();
        config.debounce_ms = 800;
        config.frame_ms = 40;
        config.greeting = "Hello there.".into();
        let state = AppState::new(config);

        let managed = state.session_settings(SessionMode::Managed, AudioFormat::mulaw_8k());
        assert_eq!(managed.debounce, Duration::from_millis(800));
        assert_eq!(managed.frame_duration, Duration::from_millis(40));
        assert_eq!(managed.greeting.as_deref(), Some("Hello there."));

        let delegated = state.session_settings(SessionMode::Delegated, AudioFormat::linear16_8k());
        assert_eq!(delegated.greeting, None);
        assert_eq!(delegated.leg_format, AudioFormat::linear16_8k());
    }
}
