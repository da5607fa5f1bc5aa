//! Real-time audio pacing.
//!
//! Telephony legs expect audio at playback cadence. Sending a whole synthesized
//! sentence in one burst overflows the remote jitter buffer, so the pacer slices
//! a buffer into fixed-duration frames and delivers each one after waiting for
//! the playback time of its bytes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::codec::{AudioError, AudioResult};
use super::format::AudioFormat;

/// Default frame duration for telephony legs.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(20);

/// Lateness tolerated before the schedule is re-anchored to the current time.
const MAX_LATENESS: Duration = Duration::from_millis(5);

/// Destination for paced audio frames.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Deliver one frame.
    ///
    /// Returns `false` once the sink is no longer writable (the call ended).
    async fn send_frame(&self, frame: Bytes) -> bool;
}

/// How a pacing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingOutcome {
    /// Every frame was delivered.
    Completed { frames: usize },
    /// Cancelled before the buffer was exhausted.
    Aborted { frames: usize },
    /// The sink stopped accepting frames.
    SinkClosed { frames: usize },
}

impl PacingOutcome {
    pub fn frames(&self) -> usize {
        match self {
            PacingOutcome::Completed { frames }
            | PacingOutcome::Aborted { frames }
            | PacingOutcome::SinkClosed { frames } => *frames,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PacingOutcome::Completed { .. })
    }
}

/// Emits audio buffers as fixed-size frames at wall-clock cadence.
#[derive(Debug, Clone, Copy)]
pub struct AudioPacer {
    frame_bytes: usize,
    interval: Duration,
}

impl AudioPacer {
    /// Create a pacer for `format`, one frame every `frame_duration`.
    pub fn new(format: AudioFormat, frame_duration: Duration) -> AudioResult<Self> {
        let frame_bytes = format.frame_bytes(frame_duration);
        if frame_bytes == 0 {
            return Err(AudioError::InvalidFormat(format!(
                "frame of {}ms holds no samples at {format}",
                frame_duration.as_millis()
            )));
        }
        Ok(Self {
            frame_bytes,
            interval: frame_duration,
        })
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of frames `len` bytes are split into.
    pub fn frame_count(&self, len: usize) -> usize {
        len.div_ceil(self.frame_bytes)
    }

    /// Playback time of `len` bytes.
    pub fn duration_of(&self, len: usize) -> Duration {
        let nanos = self.interval.as_nanos() * len as u128 / self.frame_bytes as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Stream `buffer` to `sink` at playback cadence.
    ///
    /// Each frame is sent once its own playback time has elapsed, so a full
    /// frame waits one interval and the shorter trailing frame waits only
    /// for its bytes. A buffer therefore takes as long as the audio it holds.
    /// Resolves once the last frame is sent, the sink closes, or `cancel`
    /// fires.
    pub async fn stream(
        &self,
        buffer: Bytes,
        sink: &dyn FrameSink,
        cancel: &CancellationToken,
    ) -> PacingOutcome {
        let total = self.frame_count(buffer.len());
        let mut deadline = Instant::now();

        let mut sent = 0;
        let mut offset = 0;
        while offset < buffer.len() {
            let end = (offset + self.frame_bytes).min(buffer.len());
            deadline += self.duration_of(end - offset);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(sent, total, "Audio pacing aborted");
                    return PacingOutcome::Aborted { frames: sent };
                }
                _ = sleep_until(deadline) => {}
            }

            // a stalled sink must not be followed by a burst of catch-up frames
            let now = Instant::now();
            if now > deadline + MAX_LATENESS {
                deadline = now;
            }

            if !sink.send_frame(buffer.slice(offset..end)).await {
                debug!(sent, total, "Egress sink closed during pacing");
                return PacingOutcome::SinkClosed { frames: sent };
            }
            sent += 1;
            offset = end;
        }

        PacingOutcome::Completed { frames: sent }
    }
}
