//! Deepgram live transcription client.
//!
//! Caller audio is written as binary WebSocket frames in the call's native
//! encoding (no resampling), transcripts come back as JSON `Results`
//! messages. Only the top alternative of a final result is used. While the
//! caller is silent a `KeepAlive` is sent so Deepgram keeps the stream open.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, error, info, warn};

use super::config::DeepgramSTTConfig;
use super::messages::{DeepgramControl, DeepgramMessage};
use crate::core::audio::AudioFormat;
use crate::core::stt::base::{BaseSTT, STTError, STTResult, TranscriptFragment};

/// Bounded audio queue; 50 frames is one second of 20 ms telephony audio.
const AUDIO_CHANNEL_CAPACITY: usize = 50;

pub struct DeepgramSTT {
    config: DeepgramSTTConfig,
    audio_tx: Option<mpsc::Sender<Bytes>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    connection_handle: Option<JoinHandle<()>>,
    is_connected: Arc<AtomicBool>,
}

impl DeepgramSTT {
    pub fn new(config: DeepgramSTTConfig) -> STTResult<Self> {
        if config.base.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "Deepgram API key is required".to_string(),
            ));
        }
        Ok(Self {
            config,
            audio_tx: None,
            shutdown_tx: None,
            connection_handle: None,
            is_connected: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Turn one inbound text frame into a fragment, if it carries speech.
    pub(crate) fn parse_transcript(text: &str) -> Option<TranscriptFragment> {
        match serde_json::from_str::<DeepgramMessage>(text) {
            Ok(DeepgramMessage::Results(results)) if results.is_final => {
                results.best().map(|alt| {
                    debug!(confidence = alt.confidence, "Deepgram final transcript");
                    TranscriptFragment::new(alt.transcript.as_str())
                })
            }
            Ok(DeepgramMessage::Metadata { request_id }) => {
                debug!(?request_id, "Deepgram metadata received");
                None
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to parse Deepgram message: {} - {}", e, text);
                None
            }
        }
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

#[async_trait]
impl BaseSTT for DeepgramSTT {
    async fn connect(&mut self, fragments: mpsc::Sender<TranscriptFragment>) -> STTResult<()> {
        if self.is_ready() {
            return Ok(());
        }

        let url = self.config.build_websocket_url()?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| STTError::ConnectionFailed(e.to_string()))?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.config.base.api_key))
            .map_err(|e| STTError::ConfigurationError(format!("Invalid API key: {e}")))?;
        request.headers_mut().insert("Authorization", auth);

        let (ws_stream, _response) = connect_async(request)
            .await
            .map_err(|e| STTError::ConnectionFailed(format!("Failed to connect to Deepgram: {e}")))?;

        info!(format = %self.config.audio_format(), "Connected to Deepgram STT WebSocket");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_CHANNEL_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let is_connected = self.is_connected.clone();
        is_connected.store(true, Ordering::Release);
        let keepalive_interval = self.config.keepalive_interval;

        let handle = tokio::spawn(async move {
            let mut keepalive = interval_at(Instant::now() + keepalive_interval, keepalive_interval);
            keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    Some(audio) = audio_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                            error!("Failed to send audio to Deepgram: {}", e);
                            break;
                        }
                        keepalive.reset();
                    }

                    _ = keepalive.tick() => {
                        if let Ok(json) = serde_json::to_string(&DeepgramControl::KeepAlive) {
                            debug!("No caller audio, sending Deepgram keepalive");
                            if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                error!("Failed to send keepalive to Deepgram: {}", e);
                                break;
                            }
                        }
                    }

                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(fragment) = Self::parse_transcript(&text)
                                    && fragments.send(fragment).await.is_err()
                                {
                                    debug!("Transcript receiver dropped");
                                    break;
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    warn!("Failed to send pong to Deepgram: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!(?frame, "Deepgram closed the stream");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("Deepgram WebSocket error: {}", e);
                                break;
                            }
                            None => {
                                info!("Deepgram WebSocket stream ended");
                                break;
                            }
                        }
                    }

                    _ = &mut shutdown_rx => {
                        if let Ok(json) = serde_json::to_string(&DeepgramControl::CloseStream) {
                            let _ = ws_sink.send(Message::Text(json.into())).await;
                        }
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            is_connected.store(false, Ordering::Release);
            info!("Deepgram STT WebSocket connection closed");
        });

        self.audio_tx = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.connection_handle = Some(handle);
        Ok(())
    }

    async fn send_audio(&mut self, audio: Bytes) -> STTResult<()> {
        if !self.is_ready() {
            return Err(STTError::NotConnected);
        }
        match &self.audio_tx {
            Some(tx) => tx
                .send(audio)
                .await
                .map_err(|e| STTError::NetworkError(e.to_string())),
            None => Err(STTError::NotConnected),
        }
    }

    async fn disconnect(&mut self) -> STTResult<()> {
        self.audio_tx = None;
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.connection_handle.take()
            && let Err(e) = handle.await
        {
            warn!("Deepgram connection task ended abnormally: {}", e);
        }
        self.is_connected.store(false, Ordering::Release);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }

    fn audio_format(&self) -> AudioFormat {
        self.config.audio_format()
    }

    fn provider_name(&self) -> &'static str {
        "deepgram"
    }
}
