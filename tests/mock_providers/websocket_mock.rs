//! WebSocket mock servers for Deepgram live transcription and the ElevenLabs
//! conversational agent.

use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Deepgram-style listener: answers the first audio frame of every connection
/// with one final `Results` transcript.
pub struct MockDeepgramServer {
    pub addr: SocketAddr,
    /// Audio frame sizes received, across all connections.
    pub audio: mpsc::UnboundedReceiver<usize>,
}

impl MockDeepgramServer {
    pub async fn start(transcript: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (audio_tx, audio) = mpsc::unbounded_channel();
        let transcript = transcript.to_string();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let audio_tx = audio_tx.clone();
                let transcript = transcript.clone();
                tokio::spawn(async move {
                    let _ = handle_deepgram(stream, transcript, audio_tx).await;
                });
            }
        });

        Self { addr, audio }
    }

    pub fn listen_url(&self) -> String {
        format!("ws://{}/v1/listen", self.addr)
    }
}

async fn handle_deepgram(
    stream: TcpStream,
    transcript: String,
    audio_tx: mpsc::UnboundedSender<usize>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    let metadata = json!({
        "type": "Metadata",
        "request_id": "mock-request",
        "channels": 1,
    });
    write.send(Message::Text(metadata.to_string().into())).await?;

    let mut answered = false;
    while let Some(msg) = read.next().await {
        match msg? {
            Message::Binary(audio) => {
                let _ = audio_tx.send(audio.len());
                if !answered {
                    answered = true;
                    let results = json!({
                        "type": "Results",
                        "is_final": true,
                        "speech_final": true,
                        "channel": { "alternatives": [{ "transcript": transcript, "confidence": 0.98 }] }
                    });
                    write.send(Message::Text(results.to_string().into())).await?;
                }
            }
            Message::Text(text) => {
                if let Ok(msg) = serde_json::from_str::<Value>(&text)
                    && msg["type"] == "CloseStream"
                {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

/// ElevenLabs-style agent for a single conversation.
///
/// After the initiation message it sends one audio event carrying `agent_audio`
/// and a ping, then hangs up once it has both the pong and a user audio chunk.
pub struct MockAgentServer {
    pub addr: SocketAddr,
    /// Every JSON message the gateway sent.
    pub received: mpsc::UnboundedReceiver<Value>,
}

impl MockAgentServer {
    pub async fn start(agent_audio: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let _ = handle_agent(stream, agent_audio, received_tx).await;
            }
        });

        Self { addr, received }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/agent", self.addr)
    }
}

async fn handle_agent(
    stream: TcpStream,
    agent_audio: Vec<u8>,
    received_tx: mpsc::UnboundedSender<Value>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    let mut greeted = false;
    let mut ponged = false;
    let mut heard_user = false;

    while let Some(msg) = read.next().await {
        let Message::Text(text) = msg? else { continue };
        let value: Value = serde_json::from_str(&text)?;
        let _ = received_tx.send(value.clone());

        if value["type"] == "conversation_initiation_client_data" && !greeted {
            greeted = true;
            let metadata = json!({
                "type": "conversation_initiation_metadata",
                "conversation_initiation_metadata_event": {
                    "conversation_id": "conv-1",
                    "agent_output_audio_format": "ulaw_8000",
                    "user_input_audio_format": "ulaw_8000"
                }
            });
            write.send(Message::Text(metadata.to_string().into())).await?;
            let audio = json!({
                "type": "audio",
                "audio_event": { "audio_base_64": BASE64_STANDARD.encode(&agent_audio), "event_id": 1 }
            });
            write.send(Message::Text(audio.to_string().into())).await?;
            let ping = json!({ "type": "ping", "ping_event": { "event_id": 5, "ping_ms": 10 } });
            write.send(Message::Text(ping.to_string().into())).await?;
        } else if value["type"] == "pong" {
            ponged = true;
        } else if value.get("user_audio_chunk").is_some() {
            heard_user = true;
        }

        if ponged && heard_user {
            write.send(Message::Close(None)).await?;
            break;
        }
    }
    Ok(())
}
