//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `call` - Outbound call creation and the Vonage answer probe
//! - `stream` - Telephony media-stream WebSockets (Twilio and Vonage legs)

pub mod api;
pub mod call;
pub mod stream;

pub use call::{initiate_call, vonage_answer};
