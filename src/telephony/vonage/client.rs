use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::VONAGE_CONTENT_TYPE;
use crate::config::ServerConfig;
use crate::telephony::{
    CallInitiator, CallRequest, CallerService, InitiatedCall, Pipeline, TelephonyError,
    TelephonyResult, stream_url,
};

/// Lifetime of the per-request application JWT.
const TOKEN_TTL_SECS: u64 = 900;

#[derive(Debug, Clone)]
pub struct VonageConfig {
    pub application_id: String,
    /// PEM-encoded RSA private key of the Vonage application.
    pub private_key: Vec<u8>,
    pub from_number: String,
    pub api_url: String,
    pub public_host: String,
}

impl VonageConfig {
    pub fn from_server_config(config: &ServerConfig) -> TelephonyResult<Self> {
        let missing = |key: &str| {
            TelephonyError::NotConfigured(CallerService::Vonage, format!("{key} is not set"))
        };

        let application_id = config
            .vonage_application_id
            .clone()
            .ok_or_else(|| missing("VONAGE_APPLICATION_ID"))?;
        let key_path = config
            .vonage_private_key_path
            .as_ref()
            .ok_or_else(|| missing("VONAGE_PRIVATE_KEY_PATH"))?;
        let from_number = config
            .vonage_from_number
            .clone()
            .ok_or_else(|| missing("VONAGE_FROM_NUMBER"))?;
        let private_key = std::fs::read(key_path).map_err(|e| {
            TelephonyError::NotConfigured(
                CallerService::Vonage,
                format!("cannot read private key {}: {e}", key_path.display()),
            )
        })?;

        Ok(Self {
            application_id,
            private_key,
            from_number,
            api_url: config.vonage_api_url.clone(),
            public_host: config.public_host(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ApplicationClaims<'a> {
    application_id: &'a str,
    iat: u64,
    exp: u64,
    jti: String,
}

#[derive(Debug, Deserialize)]
struct CreateCallResponse {
    uuid: String,
}

/// NCCO connecting the answered call to our WebSocket endpoint.
pub fn connect_ncco(public_host: &str, request: &CallRequest) -> Value {
    let mut uri = stream_url(public_host, CallerService::Vonage, request.pipeline);
    if request.pipeline == Pipeline::NewCustom {
        uri.push_str("?llm=");
        uri.push_str(request.stream_llm().as_str());
    }

    json!([{
        "action": "connect",
        "endpoint": [{
            "type": "websocket",
            "uri": uri,
            "content-type": VONAGE_CONTENT_TYPE,
        }],
    }])
}

/// Static NCCO served on the answer URL so the application setup can be verified.
pub fn answer_probe_ncco() -> Value {
    json!([{
        "action": "talk",
        "text": "This is a test call from Vonage. Your server is correctly returning an NCCO.",
    }])
}

/// Vonage expects bare digits without the leading `+`.
fn phone_endpoint(number: &str) -> Value {
    json!({ "type": "phone", "number": number.trim_start_matches('+') })
}

pub struct VonageClient {
    http: reqwest::Client,
    config: VonageConfig,
    key: EncodingKey,
}

impl VonageClient {
    pub fn new(http: reqwest::Client, config: VonageConfig) -> TelephonyResult<Self> {
        let key = EncodingKey::from_rsa_pem(&config.private_key)
            .map_err(|e| TelephonyError::InvalidCredentials(format!("Vonage private key: {e}")))?;
        Ok(Self { http, config, key })
    }

    fn calls_url(&self) -> String {
        format!("{}/v1/calls", self.config.api_url.trim_end_matches('/'))
    }

    fn application_token(&self) -> TelephonyResult<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let claims = ApplicationClaims {
            application_id: &self.config.application_id,
            iat,
            exp: iat + TOKEN_TTL_SECS,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| TelephonyError::InvalidCredentials(format!("JWT signing failed: {e}")))
    }
}

#[async_trait]
impl CallInitiator for VonageClient {
    async fn initiate(&self, request: &CallRequest) -> TelephonyResult<InitiatedCall> {
        let token = self.application_token()?;
        let body = json!({
            "to": [phone_endpoint(&request.to_number)],
            "from": phone_endpoint(&self.config.from_number),
            "ncco": connect_ncco(&self.config.public_host, request),
        });

        let response = self
            .http
            .post(self.calls_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TelephonyError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TelephonyError::InvalidCredentials(
                "Vonage rejected the application JWT".to_string(),
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

        info!(call_uuid = %created.uuid, pipeline = %request.pipeline, "Vonage call initiated");
        Ok(InitiatedCall {
            call_id: created.uuid,
        })
    }

    fn service(&self) -> CallerService {
        CallerService::Vonage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::LLMBackend;
    use jsonwebtoken::{DecodingKey, Validation};
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../../tests/fixtures/vonage_test_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../../../tests/fixtures/vonage_test_key.pub.pem");

    fn config(api_url: String) -> VonageConfig {
        VonageConfig {
            application_id: "app-123".to_string(),
            private_key: TEST_KEY.as_bytes().to_vec(),
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
    fn test_connect_ncco_managed_and_delegated() {
        let ncco = connect_ncco(
            "voice.example.com",
            &request(Pipeline::NewCustom, Some(LLMBackend::OpenAI)),
        );
        assert_eq!(ncco[0]["action"], "connect");
        assert_eq!(
            ncco[0]["endpoint"][0]["uri"],
            "wss://voice.example.com/vonage-custom-stream?llm=openai"
        );
        assert_eq!(ncco[0]["endpoint"][0]["content-type"], "audio/l16;rate=8000");

        let ncco = connect_ncco("voice.example.com", &request(Pipeline::ElevenLabs, None));
        assert_eq!(
            ncco[0]["endpoint"][0]["uri"],
            "wss://voice.example.com/vonage-elevenlabs-stream"
        );
    }

    #[test]
    fn test_answer_probe_is_a_talk_action() {
        let ncco = answer_probe_ncco();
        assert_eq!(ncco[0]["action"], "talk");
        assert!(ncco[0]["text"].as_str().unwrap().contains("Vonage"));
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let mut cfg = config("http://localhost".to_string());
        cfg.private_key = b"not a key".to_vec();
        assert!(matches!(
            VonageClient::new(reqwest::Client::new(), cfg),
            Err(TelephonyError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_missing_key_path_reported() {
        let mut server_config = ServerConfig::default();
        server_config.vonage_application_id = Some("app-123".to_string());
        let err = VonageConfig::from_server_config(&server_config).unwrap_err();
        assert!(err.to_string().contains("VONAGE_PRIVATE_KEY_PATH"));
    }

    #[test]
    fn test_application_token_is_signed_rs256() {
        let client = VonageClient::new(reqwest::Client::new(), config("http://x".into())).unwrap();
        let token = client.application_token().unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.required_spec_claims.clear();
        let decoded = jsonwebtoken::decode::<Value>(
            &token,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims["application_id"], "app-123");
        assert!(decoded.claims["jti"].is_string());
        assert_eq!(
            decoded.claims["exp"].as_u64().unwrap() - decoded.claims["iat"].as_u64().unwrap(),
            TOKEN_TTL_SECS
        );
    }

    #[tokio::test]
    async fn test_initiate_posts_ncco() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/calls"))
            .and(header_exists("authorization"))
            .and(body_partial_json(json!({
                "to": [{ "type": "phone", "number": "14155550100" }],
                "from": { "type": "phone", "number": "15005550006" },
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "uuid": "63f61863-4a51-4f6b-86e1-46edebcf9356",
                "status": "started",
                "direction": "outbound"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = VonageClient::new(reqwest::Client::new(), config(server.uri())).unwrap();
        let call = client
            .initiate(&request(Pipeline::NewCustom, None))
            .await
            .unwrap();
        assert_eq!(call.call_id, "63f61863-4a51-4f6b-86e1-46edebcf9356");
    }

    #[tokio::test]
    async fn test_initiate_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid number"))
            .mount(&server)
            .await;

        let client = VonageClient::new(reqwest::Client::new(), config(server.uri())).unwrap();
        let err = client
            .initiate(&request(Pipeline::ElevenLabs, None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Provider returned 422: invalid number");
    }
}
