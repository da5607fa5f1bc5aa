//! Audio plumbing shared by every call: format descriptors, the frame
//! transcoder and the real-time pacer.

pub mod codec;
pub mod format;
pub mod pacer;

pub use codec::{
    AudioError, AudioResult, linear_to_mulaw, mulaw_to_linear, resample_linear, transcode,
    unwrap_container,
};
pub use format::{AudioEncoding, AudioFormat};
pub use pacer::{AudioPacer, DEFAULT_FRAME_DURATION, FrameSink, PacingOutcome};
