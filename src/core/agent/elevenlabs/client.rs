//! ElevenLabs Conversational AI client implementing [`BaseAgent`].
//!
//! # Protocol
//!
//! 1. `GET /v1/convai/conversation/get_signed_url?agent_id=..` with `xi-api-key`
//! 2. WebSocket connect to the signed URL
//! 3. Send `conversation_initiation_client_data` declaring audio formats
//! 4. Stream `{"user_audio_chunk": b64}`; receive `audio`, `interruption`,
//!    `ping` and transcript events

use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::config::{ElevenLabsAgentConfig, format_name};
use super::messages::{ClientEvent, ServerEvent, SignedUrlResponse, UserAudioChunk};
use crate::core::agent::base::{
    AgentError, AgentEvent, AgentResult, BaseAgent, ConnectionState,
};
use crate::core::audio::AudioFormat;

/// Channel capacity for outgoing WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 256;

pub struct ElevenLabsAgent {
    config: ElevenLabsAgentConfig,
    http: reqwest::Client,
    state: Arc<RwLock<ConnectionState>>,
    ws_sender: Option<mpsc::Sender<String>>,
    connection_handle: Option<JoinHandle<()>>,
}

impl ElevenLabsAgent {
    pub fn new(http: reqwest::Client, config: ElevenLabsAgentConfig) -> AgentResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            http,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            ws_sender: None,
            connection_handle: None,
        })
    }

    async fn fetch_signed_url(&self) -> AgentResult<String> {
        let response = self
            .http
            .get(self.config.signed_url_endpoint())
            .query(&[("agent_id", self.config.agent_id.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::ConnectionFailed(format!("Signed URL request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::AuthenticationFailed(format!(
                "Failed to get signed URL ({status}): {body}"
            )));
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| AgentError::SerializationError(e.to_string()))?;
        Ok(signed.signed_url)
    }

    /// Map one server event to the relay event it produces.
    pub(crate) fn translate(event: ServerEvent) -> Option<AgentEvent> {
        match event {
            ServerEvent::ConversationInitiationMetadata {
                conversation_initiation_metadata_event: meta,
            } => {
                info!(
                    conversation_id = ?meta.conversation_id,
                    output = ?meta.agent_output_audio_format,
                    input = ?meta.user_input_audio_format,
                    "ElevenLabs conversation started"
                );
                Some(AgentEvent::Started {
                    conversation_id: meta.conversation_id,
                })
            }
            ServerEvent::Audio { audio_event } => {
                match BASE64_STANDARD.decode(audio_event.audio_base_64.as_bytes()) {
                    Ok(audio) if !audio.is_empty() => Some(AgentEvent::Audio(Bytes::from(audio))),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Failed to decode agent audio: {}", e);
                        None
                    }
                }
            }
            ServerEvent::Interruption { .. } => Some(AgentEvent::Interruption),
            ServerEvent::Ping { ping_event } => Some(AgentEvent::Ping {
                event_id: ping_event.event_id,
            }),
            ServerEvent::AgentResponse {
                agent_response_event,
            } => Some(AgentEvent::AgentResponse(
                agent_response_event.agent_response,
            )),
            ServerEvent::UserTranscript {
                user_transcription_event,
            } => Some(AgentEvent::UserTranscript(
                user_transcription_event.user_transcript,
            )),
            ServerEvent::Unknown => None,
        }
    }

    async fn send_json<T: serde::Serialize>(&self, message: &T) -> AgentResult<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| AgentError::SerializationError(e.to_string()))?;
        match &self.ws_sender {
            Some(sender) => sender
                .send(json)
                .await
                .map_err(|e| AgentError::WebSocketError(e.to_string())),
            None => Err(AgentError::NotConnected),
        }
    }
}

#[async_trait]
impl BaseAgent for ElevenLabsAgent {
    async fn connect(&mut self, events: mpsc::Sender<AgentEvent>) -> AgentResult<()> {
        if self.is_ready() {
            return Ok(());
        }
        *self.state.write() = ConnectionState::Connecting;

        let audio_format = format_name(self.config.audio_format)?;
        let signed_url = match self.fetch_signed_url().await {
            Ok(url) => url,
            Err(e) => {
                *self.state.write() = ConnectionState::Failed;
                return Err(e);
            }
        };

        let (ws_stream, _response) = match tokio_tungstenite::connect_async(signed_url.as_str())
            .await
        {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.write() = ConnectionState::Failed;
                return Err(AgentError::ConnectionFailed(e.to_string()));
            }
        };
        info!("Connected to ElevenLabs Conversational AI");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let initiation = serde_json::to_string(&ClientEvent::initiation(&audio_format))
            .map_err(|e| AgentError::SerializationError(e.to_string()))?;
        if let Err(e) = ws_sink.send(Message::Text(initiation.into())).await {
            *self.state.write() = ConnectionState::Failed;
            return Err(AgentError::WebSocketError(e.to_string()));
        }

        let (tx, mut rx) = mpsc::channel::<String>(WS_CHANNEL_CAPACITY);
        let state = self.state.clone();
        *state.write() = ConnectionState::Connected;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = rx.recv() => {
                        let Some(json) = outgoing else {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!("Failed to send message to ElevenLabs: {}", e);
                            break;
                        }
                    }

                    incoming = ws_stream.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        if let Some(event) = Self::translate(event)
                                            && events.send(event).await.is_err()
                                        {
                                            debug!("Agent event receiver dropped");
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        warn!("Failed to parse ElevenLabs event: {} - {}", e, text);
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!(?frame, "ElevenLabs closed the conversation");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("ElevenLabs WebSocket error: {}", e);
                                break;
                            }
                            None => break,
                        }
                    }
                }
            }

            *state.write() = ConnectionState::Disconnected;
            info!("ElevenLabs connection closed");
        });

        self.ws_sender = Some(tx);
        self.connection_handle = Some(handle);
        Ok(())
    }

    async fn send_audio(&mut self, audio: Bytes) -> AgentResult<()> {
        if !self.is_ready() {
            return Err(AgentError::NotConnected);
        }
        let chunk = UserAudioChunk {
            user_audio_chunk: BASE64_STANDARD.encode(&audio),
        };
        self.send_json(&chunk).await
    }

    async fn send_pong(&mut self, event_id: u64) -> AgentResult<()> {
        if !self.is_ready() {
            return Err(AgentError::NotConnected);
        }
        self.send_json(&ClientEvent::Pong { event_id }).await
    }

    async fn disconnect(&mut self) -> AgentResult<()> {
        // dropping the sender makes the task close the socket
        self.ws_sender = None;
        if let Some(handle) = self.connection_handle.take()
            && let Err(e) = handle.await
        {
            warn!("ElevenLabs connection task ended abnormally: {}", e);
        }
        *self.state.write() = ConnectionState::Disconnected;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        *self.state.read() == ConnectionState::Connected
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn audio_format(&self) -> AudioFormat {
        self.config.audio_format
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }
}
