//! Vonage WebSocket audio leg.
//!
//! The first frame is a JSON text frame with `event: "websocket:connected"`; after
//! that the leg carries raw 16-bit PCM at 8 kHz in binary frames, 20 ms (320 bytes)
//! each. Vonage does not assign a stream id, so one is generated per connection.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::session::{LegEvent, LegMessage};
use crate::telephony::{MediaCodec, WireFrame};

#[derive(Debug, Deserialize)]
struct ControlFrame {
    event: String,
    #[serde(rename = "content-type", default)]
    content_type: Option<String>,
}

#[derive(Debug)]
pub struct VonageMediaCodec {
    stream_id: String,
    llm: Option<String>,
    started: bool,
}

impl VonageMediaCodec {
    /// `llm` is the backend named in the endpoint's query string, if any.
    pub fn new(llm: Option<String>) -> Self {
        Self {
            stream_id: uuid::Uuid::new_v4().to_string(),
            llm,
            started: false,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
}

impl MediaCodec for VonageMediaCodec {
    fn decode(&mut self, frame: WireFrame) -> Option<LegEvent> {
        match frame {
            WireFrame::Binary(audio) => Some(LegEvent::Media(audio)),
            WireFrame::Text(text) => {
                let control: ControlFrame = match serde_json::from_str(&text) {
                    Ok(control) => control,
                    Err(e) => {
                        warn!("Unparseable Vonage control frame: {e}");
                        return None;
                    }
                };

                if control.event != "websocket:connected" {
                    debug!(event = %control.event, "Ignoring Vonage control frame");
                    return None;
                }
                if self.started {
                    return None;
                }
                self.started = true;

                debug!(
                    stream_id = %self.stream_id,
                    content_type = control.content_type.as_deref().unwrap_or("-"),
                    "Vonage websocket connected"
                );
                Some(LegEvent::Started {
                    stream_id: self.stream_id.clone(),
                    llm: self.llm.clone(),
                })
            }
        }
    }

    fn encode(&self, message: &LegMessage) -> Option<WireFrame> {
        match message {
            LegMessage::Media { payload, .. } => Some(WireFrame::Binary(payload.clone())),
            LegMessage::Clear { .. } => {
                debug!(stream_id = %self.stream_id, "Vonage has no clear message; skipping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const CONNECTED: &str =
        r#"{"event":"websocket:connected","content-type":"audio/l16;rate=8000"}"#;

    #[test]
    fn test_connected_starts_once_with_query_llm() {
        let mut codec = VonageMediaCodec::new(Some("openai".to_string()));
        let stream_id = codec.stream_id().to_string();

        assert_eq!(
            codec.decode(WireFrame::Text(CONNECTED.to_string())),
            Some(LegEvent::Started {
                stream_id,
                llm: Some("openai".to_string()),
            })
        );
        assert_eq!(codec.decode(WireFrame::Text(CONNECTED.to_string())), None);
    }

    #[test]
    fn test_stream_ids_are_unique() {
        assert_ne!(
            VonageMediaCodec::new(None).stream_id(),
            VonageMediaCodec::new(None).stream_id()
        );
    }

    #[test]
    fn test_binary_frames_are_media() {
        let mut codec = VonageMediaCodec::new(None);
        let frame = Bytes::from(vec![0u8; 320]);
        assert_eq!(
            codec.decode(WireFrame::Binary(frame.clone())),
            Some(LegEvent::Media(frame))
        );
    }

    #[test]
    fn test_unknown_text_frames_ignored() {
        let mut codec = VonageMediaCodec::new(None);
        assert_eq!(codec.decode(WireFrame::Text("hello".to_string())), None);
        assert_eq!(
            codec.decode(WireFrame::Text(r#"{"event":"websocket:dtmf"}"#.to_string())),
            None
        );
    }

    #[test]
    fn test_encode_media_binary_and_clear_skipped() {
        let codec = VonageMediaCodec::new(None);
        let payload = Bytes::from_static(&[1, 0, 2, 0]);
        assert_eq!(
            codec.encode(&LegMessage::Media {
                stream_id: codec.stream_id().to_string(),
                payload: payload.clone(),
            }),
            Some(WireFrame::Binary(payload))
        );
        assert_eq!(
            codec.encode(&LegMessage::Clear {
                stream_id: codec.stream_id().to_string(),
            }),
            None
        );
    }
}
