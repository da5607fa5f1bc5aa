use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::upgrade;
use crate::core::audio::AudioFormat;
use crate::core::session::SessionMode;
use crate::state::AppState;
use crate::telephony::VonageMediaCodec;

#[derive(Debug, Default, Deserialize)]
pub struct VonageStreamQuery {
    pub llm: Option<String>,
}

/// `/vonage-custom-stream?llm=..`
pub async fn vonage_managed_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<VonageStreamQuery>,
) -> Response {
    let llm = query.llm.filter(|llm| !llm.trim().is_empty());
    upgrade(
        ws,
        state,
        SessionMode::Managed,
        AudioFormat::linear16_8k(),
        VonageMediaCodec::new(llm),
    )
}

/// `/vonage-elevenlabs-stream`
pub async fn vonage_delegated_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    upgrade(
        ws,
        state,
        SessionMode::Delegated,
        AudioFormat::linear16_8k(),
        VonageMediaCodec::new(None),
    )
}
