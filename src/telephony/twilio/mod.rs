//! Twilio Programmable Voice: REST call creation and Media Streams.

mod client;
mod media;

pub use client::{TwilioClient, TwilioConfig, twiml_for};
pub use media::TwilioMediaCodec;
