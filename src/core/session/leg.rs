//! Provider-neutral view of the telephony leg.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::core::audio::FrameSink;

/// Control and media events arriving from the caller's leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegEvent {
    /// The leg opened a media stream.
    Started {
        stream_id: String,
        /// Language-model backend requested by the dial instructions.
        llm: Option<String>,
    },
    /// One frame of caller audio in the leg's native format.
    Media(Bytes),
    Stopped,
}

/// Messages written back to the leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegMessage {
    Media { stream_id: String, payload: Bytes },
    /// Drop any audio the leg has buffered but not yet played.
    Clear { stream_id: String },
}

/// Frame sink that wraps each paced frame in a [`LegMessage::Media`].
pub struct EgressSink {
    stream_id: String,
    tx: mpsc::Sender<LegMessage>,
}

impl EgressSink {
    pub fn new(stream_id: impl Into<String>, tx: mpsc::Sender<LegMessage>) -> Self {
        Self {
            stream_id: stream_id.into(),
            tx,
        }
    }
}

#[async_trait]
impl FrameSink for EgressSink {
    async fn send_frame(&self, frame: Bytes) -> bool {
        self.tx
            .send(LegMessage::Media {
                stream_id: self.stream_id.clone(),
                payload: frame,
            })
            .await
            .is_ok()
    }
}
