mod client;
mod config;
mod messages;

pub use client::DeepgramSTT;
pub use config::{DEEPGRAM_LISTEN_URL, DEFAULT_DEEPGRAM_MODEL, DeepgramSTTConfig};
pub use messages::{DeepgramControl, DeepgramMessage, ResultsMessage};
