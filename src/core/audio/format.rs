//! Audio format descriptors shared by telephony legs and AI services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Sample encoding of a raw (headerless) audio buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// G.711 µ-law, 8 bits per sample
    Mulaw,
    /// Signed 16-bit little-endian linear PCM
    Linear16,
}

impl AudioEncoding {
    /// Number of bytes used to store one sample.
    #[inline]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            AudioEncoding::Mulaw => 1,
            AudioEncoding::Linear16 => 2,
        }
    }

    /// Name used in speech service query strings.
    pub const fn as_str(self) -> &'static str {
        match self {
            AudioEncoding::Mulaw => "mulaw",
            AudioEncoding::Linear16 => "linear16",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mulaw" | "ulaw" | "pcmu" => Ok(AudioEncoding::Mulaw),
            "linear16" | "pcm" | "l16" => Ok(AudioEncoding::Linear16),
            other => Err(format!(
                "Unsupported audio encoding: {other}. Supported encodings: mulaw, linear16"
            )),
        }
    }
}

/// Mono audio format: encoding plus sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
}

impl AudioFormat {
    pub const fn new(encoding: AudioEncoding, sample_rate: u32) -> Self {
        Self {
            encoding,
            sample_rate,
        }
    }

    /// µ-law at 8 kHz, the Twilio media stream format.
    pub const fn mulaw_8k() -> Self {
        Self::new(AudioEncoding::Mulaw, 8000)
    }

    /// 16-bit PCM at 8 kHz, the Vonage websocket format.
    pub const fn linear16_8k() -> Self {
        Self::new(AudioEncoding::Linear16, 8000)
    }

    /// Bytes needed to hold `duration` of audio in this format.
    ///
    /// 20 ms of µ-law 8 kHz is 160 bytes, 20 ms of PCM16 8 kHz is 320 bytes.
    pub fn frame_bytes(&self, duration: Duration) -> usize {
        let samples = (self.sample_rate as u128 * duration.as_micros()) / 1_000_000;
        samples as usize * self.encoding.bytes_per_sample()
    }

    /// Playback duration of a buffer of `len` bytes.
    pub fn duration_of(&self, len: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let samples = (len / self.encoding.bytes_per_sample()) as u64;
        Duration::from_micros(samples * 1_000_000 / self.sample_rate as u64)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}Hz", self.encoding, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bytes_for_telephony_formats() {
        let frame = Duration::from_millis(20);
        assert_eq!(AudioFormat::mulaw_8k().frame_bytes(frame), 160);
        assert_eq!(AudioFormat::linear16_8k().frame_bytes(frame), 320);
        assert_eq!(
            AudioFormat::new(AudioEncoding::Linear16, 16000).frame_bytes(frame),
            640
        );
    }

    #[test]
    fn test_duration_of() {
        assert_eq!(
            AudioFormat::linear16_8k().duration_of(16000),
            Duration::from_secs(1)
        );
        assert_eq!(
            AudioFormat::mulaw_8k().duration_of(160),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("MULAW".parse::<AudioEncoding>(), Ok(AudioEncoding::Mulaw));
        assert_eq!("l16".parse::<AudioEncoding>(), Ok(AudioEncoding::Linear16));
        let err = "opus".parse::<AudioEncoding>().unwrap_err();
        assert!(err.contains("Supported encodings"));
    }

    #[test]
    fn test_display() {
        assert_eq!(AudioFormat::mulaw_8k().to_string(), "mulaw@8000Hz");
    }
}
