//! Twilio Media Streams protocol.
//!
//! Inbound JSON text frames are tagged by `event`: `connected`, `start`, `media`,
//! `stop` and `mark`. Audio is base64 µ-law 8 kHz in both directions.

use base64::prelude::*;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::core::session::{LegEvent, LegMessage};
use crate::telephony::{MediaCodec, WireFrame};

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum InboundEvent {
    Connected,
    Start { start: StartPayload },
    Media { media: MediaPayload },
    Stop,
    Mark,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPayload {
    stream_sid: String,
    #[serde(default)]
    call_sid: Option<String>,
    #[serde(default)]
    custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    payload: String,
}

#[derive(Debug, Default)]
pub struct TwilioMediaCodec;

impl TwilioMediaCodec {
    pub fn new() -> Self {
        Self
    }
}

impl MediaCodec for TwilioMediaCodec {
    fn decode(&mut self, frame: WireFrame) -> Option<LegEvent> {
        let WireFrame::Text(text) = frame else {
            debug!("Ignoring binary frame on Twilio stream");
            return None;
        };

        let event = match serde_json::from_str::<InboundEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Unparseable Twilio stream message: {e}");
                return None;
            }
        };

        match event {
            InboundEvent::Connected => {
                debug!("Twilio media stream connected");
                None
            }
            InboundEvent::Start { mut start } => {
                debug!(
                    stream_sid = %start.stream_sid,
                    call_sid = start.call_sid.as_deref().unwrap_or("-"),
                    "Twilio media stream started"
                );
                Some(LegEvent::Started {
                    stream_id: start.stream_sid,
                    llm: start.custom_parameters.remove("llm"),
                })
            }
            InboundEvent::Media { media } => match BASE64_STANDARD.decode(media.payload) {
                Ok(audio) => Some(LegEvent::Media(Bytes::from(audio))),
                Err(e) => {
                    warn!("Invalid base64 media payload: {e}");
                    None
                }
            },
            InboundEvent::Stop => Some(LegEvent::Stopped),
            InboundEvent::Mark | InboundEvent::Other => None,
        }
    }

    fn encode(&self, message: &LegMessage) -> Option<WireFrame> {
        let value = match message {
            LegMessage::Media { stream_id, payload } => json!({
                "event": "media",
                "streamSid": stream_id,
                "media": { "payload": BASE64_STANDARD.encode(payload) },
            }),
            LegMessage::Clear { stream_id } => json!({
                "event": "clear",
                "streamSid": stream_id,
            }),
        };
        Some(WireFrame::Text(value.to_string()))
    }
}
