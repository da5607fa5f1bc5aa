//! Telephony media-stream WebSockets.
//!
//! Each endpoint pairs a caller service's [`MediaCodec`] with a session mode.
//! Inbound frames are decoded into leg events for a [`CallSession`]; the
//! session's egress messages are encoded back onto the socket by a sender task.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt, future};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::audio::AudioFormat;
use crate::core::session::{CallSession, LegEvent, LegMessage, SessionMode};
use crate::state::AppState;
use crate::telephony::{MediaCodec, WireFrame};

mod twilio;
mod vonage;

pub use twilio::{twilio_delegated_handler, twilio_managed_handler};
pub use vonage::{VonageStreamQuery, vonage_delegated_handler, vonage_managed_handler};

/// Egress buffer between the session and the socket writer
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Time allowed for queued egress and the close frame once the session ends
const EGRESS_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Upgrade the connection and run one call session over it.
pub(crate) fn upgrade<C>(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    mode: SessionMode,
    leg_format: AudioFormat,
    codec: C,
) -> Response
where
    C: MediaCodec + 'static,
{
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            let settings = state.session_settings(mode, leg_format);
            let session = CallSession::new(settings, state.providers.clone());
            run_leg(socket, codec, session).await;
        })
}

fn decode_message<C: MediaCodec>(
    codec: &Mutex<C>,
    message: Result<Message, axum::Error>,
) -> Option<LegEvent> {
    match message {
        Ok(Message::Text(text)) => codec.lock().decode(WireFrame::Text(text.as_str().to_owned())),
        Ok(Message::Binary(data)) => codec.lock().decode(WireFrame::Binary(data)),
        Ok(Message::Close(frame)) => {
            debug!(?frame, "Leg sent close frame");
            Some(LegEvent::Stopped)
        }
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Err(e) => {
            warn!("Leg WebSocket error: {e}");
            Some(LegEvent::Stopped)
        }
    }
}

async fn run_leg<C>(socket: WebSocket, codec: C, session: CallSession)
where
    C: MediaCodec + 'static,
{
    info!("Telephony leg connected");

    let (mut sender, receiver) = socket.split();
    let (egress_tx, mut egress_rx) = mpsc::channel::<LegMessage>(CHANNEL_BUFFER_SIZE);
    let codec = Arc::new(Mutex::new(codec));

    let encoder = codec.clone();
    let sender_task = tokio::spawn(async move {
        while let Some(message) = egress_rx.recv().await {
            let frame = encoder.lock().encode(&message);
            let ws_message = match frame {
                Some(WireFrame::Text(text)) => Message::Text(text.into()),
                Some(WireFrame::Binary(data)) => Message::Binary(data),
                None => continue,
            };
            if let Err(e) = sender.send(ws_message).await {
                error!("Failed to send to leg: {e}");
                break;
            }
        }
        let _ = sender.close().await;
    });

    let events =
        receiver.filter_map(move |message| future::ready(decode_message(&codec, message)));

    let mut states = session.subscribe();
    let state_log = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            debug!(%state, "Call state changed");
        }
    });

    if let Err(e) = session.run(events, egress_tx).await {
        error!("Call session failed: {e}");
    }

    // the session has dropped its egress sender, so the writer drains and closes
    let mut sender_task = sender_task;
    if tokio::time::timeout(EGRESS_FLUSH_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        warn!("Leg writer did not finish flushing, aborting");
        sender_task.abort();
    }
    state_log.abort();
    info!("Telephony leg closed");
}
