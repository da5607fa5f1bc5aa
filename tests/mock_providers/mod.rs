//! Mock provider servers for end-to-end tests
//!
//! HTTP providers (Ollama, OpenAI, Google TTS, the ElevenLabs signed-URL lookup,
//! Twilio and Vonage) are mocked with `wiremock`. The WebSocket providers are
//! small `tokio-tungstenite` servers in [`websocket_mock`].

#![allow(dead_code)]

pub mod websocket_mock;

pub use websocket_mock::{MockAgentServer, MockDeepgramServer};

use base64::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Ollama `/api/chat` answering every request with the given tokens as NDJSON.
pub async fn mount_ollama_reply(server: &MockServer, tokens: &[&str]) {
    let mut body = String::new();
    for token in tokens {
        body.push_str(
            &json!({ "message": { "role": "assistant", "content": token }, "done": false })
                .to_string(),
        );
        body.push('\n');
    }
    body.push_str(&json!({ "message": { "role": "assistant", "content": "" }, "done": true }).to_string());
    body.push('\n');

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Google `text:synthesize` returning `pcm` as base64 audio content.
pub async fn mount_google_tts(server: &MockServer, pcm: &[u8]) {
    Mock::given(method("POST"))
        .and(path("/v1/text:synthesize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audioContent": BASE64_STANDARD.encode(pcm)
        })))
        .mount(server)
        .await;
}

/// ElevenLabs signed-URL lookup pointing at a mock agent socket.
pub async fn mount_signed_url(server: &MockServer, signed_url: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/convai/conversation/get_signed_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signed_url": signed_url
        })))
        .mount(server)
        .await;
}
