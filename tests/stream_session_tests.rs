//! End-to-end calls over the stream endpoints with mocked AI services.

mod fixtures;
mod mock_providers;

use std::time::Duration;

use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use wiremock::MockServer;

use fixtures::{base_config, mulaw_silence_frame, pcm_silence_frame, spawn_gateway};
use mock_providers::{
    MockAgentServer, MockDeepgramServer, mount_google_tts, mount_ollama_reply, mount_signed_url,
};
use voxcall_gateway::AppState;

const STEP: Duration = Duration::from_secs(10);

type Leg = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Next Twilio `media` message, skipping anything else.
async fn next_twilio_media(leg: &mut Leg) -> Value {
    loop {
        let msg = timeout(STEP, leg.next())
            .await
            .expect("timed out waiting for media")
            .expect("leg closed")
            .unwrap();
        if let Message::Text(text) = msg {
            let value: Value = serde_json::from_str(&text).unwrap();
            if value["event"] == "media" {
                return value;
            }
        }
    }
}

/// Wait for the gateway to end the call.
async fn expect_closed(leg: &mut Leg) {
    loop {
        match timeout(STEP, leg.next()).await.expect("leg stayed open") {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => {}
        }
    }
}

/// Wait for a WebSocket close frame from the gateway.
async fn expect_close_frame(leg: &mut Leg) {
    loop {
        match timeout(STEP, leg.next()).await.expect("leg stayed open") {
            Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => {}
            other => panic!("leg dropped without a close frame: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_twilio_managed_call_greets_and_replies() {
    let deepgram = MockDeepgramServer::start("what time is it").await;
    let http = MockServer::start().await;
    mount_ollama_reply(&http, &["It is", " noon.", " Anything", " else?"]).await;
    mount_google_tts(&http, &pcm_silence_frame()).await;

    let mut config = base_config();
    config.deepgram_api_key = Some("dg-key".to_string());
    config.deepgram_url = Some(deepgram.listen_url());
    config.ollama_url = http.uri();
    config.google_tts_api_key = Some("g-key".to_string());
    config.google_tts_url = Some(http.uri());
    config.greeting = "Hello, how can I help?".to_string();
    let addr = spawn_gateway(AppState::new(config)).await;

    let (mut leg, _) = connect_async(format!("ws://{addr}/custom-stream")).await.unwrap();
    leg.send(Message::Text(
        json!({"event": "connected", "protocol": "Call", "version": "1.0.0"})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();
    leg.send(Message::Text(
        json!({
            "event": "start",
            "streamSid": "MZ1",
            "start": {
                "streamSid": "MZ1",
                "callSid": "CA1",
                "customParameters": { "llm": "mistral" }
            }
        })
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    // Greeting: one 20 ms frame, transcoded to µ-law.
    let greeting = next_twilio_media(&mut leg).await;
    assert_eq!(greeting["streamSid"], "MZ1");
    let payload = BASE64_STANDARD
        .decode(greeting["media"]["payload"].as_str().unwrap())
        .unwrap();
    assert_eq!(payload.len(), 160);

    let caller_audio = BASE64_STANDARD.encode(mulaw_silence_frame());
    leg.send(Message::Text(
        json!({"event": "media", "streamSid": "MZ1", "media": {"payload": caller_audio}})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    // Two sentences in the reply, one frame each.
    next_twilio_media(&mut leg).await;
    next_twilio_media(&mut leg).await;

    let requests = http.received_requests().await.unwrap();
    let chat = requests
        .iter()
        .find(|r| r.url.path() == "/api/chat")
        .expect("no generation request");
    let body: Value = serde_json::from_slice(&chat.body).unwrap();
    assert_eq!(body["messages"][1]["content"], "what time is it");

    let synthesized: Vec<String> = requests
        .iter()
        .filter(|r| r.url.path() == "/v1/text:synthesize")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["input"]["text"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        synthesized,
        vec!["Hello, how can I help?", "It is noon.", "Anything else?"]
    );

    leg.send(Message::Text(
        json!({"event": "stop", "streamSid": "MZ1"}).to_string().into(),
    ))
    .await
    .unwrap();
    expect_closed(&mut leg).await;
}

#[tokio::test]
async fn test_twilio_managed_call_without_stt_credentials_ends() {
    let addr = spawn_gateway(AppState::new(base_config())).await;

    let (mut leg, _) = connect_async(format!("ws://{addr}/custom-stream")).await.unwrap();
    leg.send(Message::Text(
        json!({"event": "start", "start": {"streamSid": "MZ2"}})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    expect_close_frame(&mut leg).await;
}

#[tokio::test]
async fn test_vonage_delegated_call_relays_agent() {
    let mut agent = MockAgentServer::start(mulaw_silence_frame()).await;
    let http = MockServer::start().await;
    mount_signed_url(&http, &agent.url()).await;

    let mut config = base_config();
    config.elevenlabs_api_key = Some("xi-key".to_string());
    config.elevenlabs_agent_id = Some("agent-1".to_string());
    config.elevenlabs_url = Some(http.uri());
    let addr = spawn_gateway(AppState::new(config)).await;

    let (mut leg, _) = connect_async(format!("ws://{addr}/vonage-elevenlabs-stream"))
        .await
        .unwrap();
    leg.send(Message::Text(
        json!({"event": "websocket:connected", "content-type": "audio/l16;rate=8000"})
            .to_string()
            .into(),
    ))
    .await
    .unwrap();

    // Agent audio arrives as one 20 ms linear PCM frame.
    let frame = loop {
        let msg = timeout(STEP, leg.next()).await.unwrap().unwrap().unwrap();
        if let Message::Binary(data) = msg {
            break data;
        }
    };
    assert_eq!(frame.len(), 320);
    assert!(frame.iter().all(|b| *b == 0));

    leg.send(Message::Binary(pcm_silence_frame().into()))
        .await
        .unwrap();

    let mut initiation = None;
    let mut pong = None;
    let mut user_audio = None;
    while initiation.is_none() || pong.is_none() || user_audio.is_none() {
        let message = timeout(STEP, agent.received.recv())
            .await
            .unwrap()
            .expect("agent stopped early");
        match message["type"].as_str() {
            Some("conversation_initiation_client_data") => initiation = Some(message),
            Some("pong") => pong = Some(message),
            _ if message.get("user_audio_chunk").is_some() => user_audio = Some(message),
            _ => {}
        }
    }

    assert_eq!(
        initiation.unwrap()["conversation_config_override"]["agent"]["user_input_audio_format"],
        "ulaw_8000"
    );
    assert_eq!(pong.unwrap()["event_id"], 5);
    let chunk = BASE64_STANDARD
        .decode(user_audio.unwrap()["user_audio_chunk"].as_str().unwrap())
        .unwrap();
    assert_eq!(chunk.len(), 160);

    // The agent hangs up, which ends the call.
    expect_closed(&mut leg).await;
}
