use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

use super::upgrade;
use crate::core::audio::AudioFormat;
use crate::core::session::SessionMode;
use crate::state::AppState;
use crate::telephony::TwilioMediaCodec;

/// `/custom-stream`: managed pipeline; the backend arrives in the start event's
/// `customParameters.llm`.
pub async fn twilio_managed_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    upgrade(
        ws,
        state,
        SessionMode::Managed,
        AudioFormat::mulaw_8k(),
        TwilioMediaCodec::new(),
    )
}

/// `/elevenlabs-stream`
pub async fn twilio_delegated_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    upgrade(
        ws,
        state,
        SessionMode::Delegated,
        AudioFormat::mulaw_8k(),
        TwilioMediaCodec::new(),
    )
}
