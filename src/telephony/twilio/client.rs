use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::config::ServerConfig;
use crate::telephony::{
    CallInitiator, CallRequest, CallerService, InitiatedCall, Pipeline, TelephonyError,
    TelephonyResult, stream_url,
};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_url: String,
    /// Host (without scheme) Twilio connects the media stream back to.
    pub public_host: String,
}

impl TwilioConfig {
    pub fn from_server_config(config: &ServerConfig) -> TelephonyResult<Self> {
        let required = |value: &Option<String>, key: &str| {
            value.clone().ok_or_else(|| {
                TelephonyError::NotConfigured(CallerService::Twilio, format!("{key} is not set"))
            })
        };

        Ok(Self {
            account_sid: required(&config.twilio_account_sid, "TWILIO_ACCOUNT_SID")?,
            auth_token: required(&config.twilio_auth_token, "TWILIO_AUTH_TOKEN")?,
            from_number: required(&config.twilio_from_number, "TWILIO_FROM_NUMBER")?,
            api_url: config.twilio_api_url.clone(),
            public_host: config.public_host(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateCallResponse {
    sid: String,
}

/// Dial instructions connecting the answered call to our stream endpoint.
pub fn twiml_for(public_host: &str, request: &CallRequest) -> String {
    let url = stream_url(public_host, CallerService::Twilio, request.pipeline);
    match request.pipeline {
        Pipeline::NewCustom => format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                "<Response><Connect><Stream url=\"{}\">",
                "<Parameter name=\"llm\" value=\"{}\" />",
                "</Stream></Connect></Response>"
            ),
            url,
            request.stream_llm()
        ),
        Pipeline::ElevenLabs => format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                "<Response><Connect><Stream url=\"{}\" /></Connect></Response>"
            ),
            url
        ),
    }
}

pub struct TwilioClient {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(http: reqwest::Client, config: TwilioConfig) -> Self {
        Self { http, config }
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl CallInitiator for TwilioClient {
    async fn initiate(&self, request: &CallRequest) -> TelephonyResult<InitiatedCall> {
        let twiml = twiml_for(&self.config.public_host, request);
        let form = [
            ("From", self.config.from_number.as_str()),
            ("To", request.to_number.as_str()),
            ("Twiml", twiml.as_str()),
        ];

        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| TelephonyError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TelephonyError::InvalidCredentials(
                "Twilio rejected the account SID or auth token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateCallResponse = response
            .json()
            .await
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))?;

        info!(call_sid = %created.sid, pipeline = %request.pipeline, "Twilio call initiated");
        Ok(InitiatedCall {
            call_id: created.sid,
        })
    }

    fn service(&self) -> CallerService {
        CallerService::Twilio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::LLMBackend;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: String) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15005550006".to_string(),
            api_url,
            public_host: "voice.example.com".to_string(),
        }
    }

    fn request(pipeline: Pipeline, llm: Option<LLMBackend>) -> CallRequest {
        CallRequest {
            to_number: "+14155550100".to_string(),
            pipeline,
            llm,
        }
    }

    #[test]
    fn test_twiml_managed_carries_llm_parameter() {
        let twiml = twiml_for(
            "voice.example.com",
            &request(Pipeline::NewCustom, Some(LLMBackend::OpenAI)),
        );
        assert!(twiml.contains(r#"<Stream url="wss://voice.example.com/custom-stream">"#));
        assert!(twiml.contains(r#"<Parameter name="llm" value="openai" />"#));

        let twiml = twiml_for("voice.example.com", &request(Pipeline::NewCustom, None));
        assert!(twiml.contains(r#"value="mistral""#));
    }

    #[test]
    fn test_twiml_delegated_has_no_parameters() {
        let twiml = twiml_for("voice.example.com", &request(Pipeline::ElevenLabs, None));
        assert!(twiml.contains(r#"<Stream url="wss://voice.example.com/elevenlabs-stream" />"#));
        assert!(!twiml.contains("Parameter"));
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let mut server_config = ServerConfig::default();
        server_config.twilio_account_sid = Some("AC123".to_string());
        let err = TwilioConfig::from_server_config(&server_config).unwrap_err();
        assert!(err.to_string().contains("TWILIO_AUTH_TOKEN"));
    }

    #[tokio::test]
    async fn test_initiate_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Calls.json"))
            .and(basic_auth("AC123", "secret"))
            .and(body_string_contains("To=%2B14155550100"))
            .and(body_string_contains("From=%2B15005550006"))
            .and(body_string_contains("custom-stream"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sid": "CA42",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::new(reqwest::Client::new(), config(server.uri()));
        let call = client
            .initiate(&request(Pipeline::NewCustom, None))
            .await
            .unwrap();
        assert_eq!(call.call_id, "CA42");
        assert_eq!(client.service(), CallerService::Twilio);
    }

    #[tokio::test]
    async fn test_initiate_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"message":"Invalid To number"}"#),
            )
            .mount(&server)
            .await;

        let client = TwilioClient::new(reqwest::Client::new(), config(server.uri()));
        match client.initiate(&request(Pipeline::ElevenLabs, None)).await {
            Err(TelephonyError::Provider { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Invalid To number"));
            }
            other => panic!("Expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_initiate_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = TwilioClient::new(reqwest::Client::new(), config(server.uri()));
        let result = client.initiate(&request(Pipeline::NewCustom, None)).await;
        assert!(matches!(result, Err(TelephonyError::InvalidCredentials(_))));
    }
}
