//! Vonage Voice API: JWT-authenticated call creation and the WebSocket audio leg.

mod client;
mod media;

pub use client::{VonageClient, VonageConfig, answer_probe_ncco, connect_ncco};
pub use media::VonageMediaCodec;

/// Audio format declared on every Vonage WebSocket endpoint.
pub const VONAGE_CONTENT_TYPE: &str = "audio/l16;rate=8000";
