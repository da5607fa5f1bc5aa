//! Frame transcoding between telephony and speech-service audio formats.
//!
//! Everything here is pure and stateless: a call keeps no codec state between
//! frames, so any frame can be converted independently.
//!
//! Supported conversions are any combination of µ-law / 16-bit PCM at any
//! sample rate, with linear-interpolation resampling. Synthesized audio that
//! arrives wrapped in a RIFF/WAV container can be unwrapped with
//! [`unwrap_container`].

use std::io::Cursor;

use bytes::Bytes;
use thiserror::Error;

use super::format::{AudioEncoding, AudioFormat};

/// Errors produced while transcoding audio.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Invalid buffer length {len} for {encoding}")]
    InvalidLength { len: usize, encoding: AudioEncoding },

    #[error("Failed to parse WAV container: {0}")]
    Container(String),
}

pub type AudioResult<T> = Result<T, AudioError>;

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32635;

/// Compress one linear sample to G.711 µ-law.
#[inline]
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };
    magnitude = magnitude.min(MULAW_CLIP) + MULAW_BIAS;

    let mut exponent: i32 = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;

    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Expand one G.711 µ-law byte to a linear sample.
#[inline]
pub fn mulaw_to_linear(byte: u8) -> i16 {
    let value = !byte;
    let sign = value & 0x80;
    let exponent = ((value >> 4) & 0x07) as i32;
    let mantissa = (value & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Interpret little-endian bytes as 16-bit samples.
pub fn pcm16_to_samples(data: &[u8]) -> AudioResult<Vec<i16>> {
    if data.len() % 2 != 0 {
        return Err(AudioError::InvalidLength {
            len: data.len(),
            encoding: AudioEncoding::Linear16,
        });
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn samples_to_pcm16(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Linear-interpolation resampler.
pub fn resample_linear(samples: &[i16], src_rate: u32, dst_rate: u32) -> Vec<i16> {
    if samples.is_empty() || src_rate == dst_rate {
        return samples.to_vec();
    }

    let ratio = dst_rate as f64 / src_rate as f64;
    let out_len = ((samples.len() as f64) * ratio).round().max(1.0) as usize;
    let last = samples.len() - 1;
    let mut out = Vec::with_capacity(out_len);

    for idx in 0..out_len {
        let src_pos = idx as f64 / ratio;
        let left = (src_pos.floor() as usize).min(last);
        let right = (left + 1).min(last);
        let frac = src_pos - left as f64;
        let value = samples[left] as f64 * (1.0 - frac) + samples[right] as f64 * frac;
        out.push(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    out
}

fn decode_samples(input: &[u8], encoding: AudioEncoding) -> AudioResult<Vec<i16>> {
    match encoding {
        AudioEncoding::Mulaw => Ok(input.iter().copied().map(mulaw_to_linear).collect()),
        AudioEncoding::Linear16 => pcm16_to_samples(input),
    }
}

fn encode_samples(samples: &[i16], encoding: AudioEncoding) -> Vec<u8> {
    match encoding {
        AudioEncoding::Mulaw => samples.iter().copied().map(linear_to_mulaw).collect(),
        AudioEncoding::Linear16 => samples_to_pcm16(samples),
    }
}

/// Convert a raw audio buffer from one format to another.
///
/// Identical formats are passed through untouched.
pub fn transcode(input: &[u8], from: AudioFormat, to: AudioFormat) -> AudioResult<Bytes> {
    if from.sample_rate == 0 || to.sample_rate == 0 {
        return Err(AudioError::InvalidFormat(format!(
            "sample rate must be non-zero ({from} -> {to})"
        )));
    }
    if from == to {
        return Ok(Bytes::copy_from_slice(input));
    }

    let samples = decode_samples(input, from.encoding)?;
    let samples = if from.sample_rate != to.sample_rate {
        resample_linear(&samples, from.sample_rate, to.sample_rate)
    } else {
        samples
    };

    Ok(Bytes::from(encode_samples(&samples, to.encoding)))
}

/// Strip a RIFF/WAV container if present.
///
/// Headerless input is returned as-is with the `declared` format. PCM WAV data
/// is decoded with `hound` (multi-channel input is downmixed to mono) and
/// reported with the sample rate from the header. Payloads `hound` cannot read,
/// such as µ-law WAV, fall back to the raw `data` chunk in the declared format.
pub fn unwrap_container(data: Bytes, declared: AudioFormat) -> AudioResult<(Bytes, AudioFormat)> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Ok((data, declared));
    }

    match hound::WavReader::new(Cursor::new(&data[..])) {
        Ok(reader) => decode_pcm_wav(reader),
        Err(e) => find_data_chunk(&data)
            .map(|payload| (payload, declared))
            .map_err(|_| AudioError::Container(e.to_string())),
    }
}

fn decode_pcm_wav<R: std::io::Read>(
    mut reader: hound::WavReader<R>,
) -> AudioResult<(Bytes, AudioFormat)> {
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::Container(format!(
            "unsupported sample layout: {:?} {} bits",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<Result<_, _>>()
        .map_err(|e| AudioError::Container(e.to_string()))?;

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<i16> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| (frame.iter().map(|s| *s as i32).sum::<i32>() / frame.len() as i32) as i16)
            .collect()
    } else {
        samples
    };

    Ok((
        Bytes::from(samples_to_pcm16(&mono)),
        AudioFormat::new(AudioEncoding::Linear16, spec.sample_rate),
    ))
}

fn find_data_chunk(data: &Bytes) -> AudioResult<Bytes> {
    let mut offset = 12;
    while offset + 8 <= data.len() {
        let id = &data[offset..offset + 4];
        let size = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        let body = offset + 8;
        if id == b"data" {
            let end = body.saturating_add(size).min(data.len());
            return Ok(data.slice(body..end));
        }
        // chunks are word aligned
        offset = body.saturating_add(size + (size & 1));
    }
    Err(AudioError::Container("missing data chunk".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mulaw_silence() {
        assert_eq!(linear_to_mulaw(0), 0xFF);
        assert_eq!(mulaw_to_linear(0xFF), 0);
        assert_eq!(mulaw_to_linear(0x7F), 0);
    }

    #[test]
    fn test_mulaw_extremes_clip() {
        assert_eq!(linear_to_mulaw(i16::MAX), 0x80);
        assert_eq!(linear_to_mulaw(i16::MIN + 1), 0x00);
        assert_eq!(mulaw_to_linear(0x80), 32124);
        assert_eq!(mulaw_to_linear(0x00), -32124);
    }

    #[test]
    fn test_mulaw_companding_error_is_bounded() {
        for sample in (-32000i16..32000).step_by(97) {
            let decoded = mulaw_to_linear(linear_to_mulaw(sample));
            let error = (sample as i32 - decoded as i32).abs();
            // quantization step grows with magnitude, roughly 1/16 of the segment
            let bound = (sample as i32).abs() / 16 + 16;
            assert!(
                error <= bound,
                "sample {sample} decoded to {decoded} (error {error})"
            );
        }
    }

    #[test]
    fn test_mulaw_sign_symmetry() {
        for sample in [100i16, 1000, 10000, 30000] {
            let pos = mulaw_to_linear(linear_to_mulaw(sample));
            let neg = mulaw_to_linear(linear_to_mulaw(-sample));
            assert_eq!(pos, -neg);
        }
    }

    #[test]
    fn test_pcm16_rejects_odd_length() {
        let err = pcm16_to_samples(&[0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            AudioError::InvalidLength {
                len: 3,
                encoding: AudioEncoding::Linear16
            }
        );
    }

    #[test]
    fn test_resample_lengths() {
        let input = vec![0i16; 160];
        assert_eq!(resample_linear(&input, 8000, 16000).len(), 320);
        assert_eq!(resample_linear(&input, 8000, 4000).len(), 80);
        assert_eq!(resample_linear(&input, 8000, 8000).len(), 160);
        assert!(resample_linear(&[], 8000, 16000).is_empty());
    }

    #[test]
    fn test_resample_interpolates() {
        let out = resample_linear(&[0, 100], 1, 2);
        assert_eq!(out, vec![0, 50, 100, 100]);
    }

    #[test]
    fn test_transcode_mulaw_to_linear16() {
        let input = vec![0xFFu8; 160];
        let out = transcode(&input, AudioFormat::mulaw_8k(), AudioFormat::linear16_8k()).unwrap();
        assert_eq!(out.len(), 320);
        assert!(out.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_transcode_linear16_to_mulaw_with_resample() {
        let pcm = samples_to_pcm16(&vec![0i16; 320]);
        let out = transcode(
            &pcm,
            AudioFormat::new(AudioEncoding::Linear16, 16000),
            AudioFormat::mulaw_8k(),
        )
        .unwrap();
        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_transcode_same_format_passthrough() {
        let input = vec![1u8, 2, 3];
        let out = transcode(&input, AudioFormat::mulaw_8k(), AudioFormat::mulaw_8k()).unwrap();
        assert_eq!(&out[..], &input[..]);
    }

    #[test]
    fn test_transcode_rejects_zero_rate() {
        let result = transcode(
            &[0, 0],
            AudioFormat::new(AudioEncoding::Linear16, 0),
            AudioFormat::mulaw_8k(),
        );
        assert!(matches!(result, Err(AudioError::InvalidFormat(_))));
    }

    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_unwrap_container_pcm_wav() {
        let wav = wav_bytes(&[1, 2, 3, 4], 24000, 1);
        let (payload, format) =
            unwrap_container(Bytes::from(wav), AudioFormat::linear16_8k()).unwrap();
        assert_eq!(format, AudioFormat::new(AudioEncoding::Linear16, 24000));
        assert_eq!(pcm16_to_samples(&payload).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unwrap_container_downmixes_stereo() {
        let wav = wav_bytes(&[10, 20, -10, -30], 8000, 2);
        let (payload, _) = unwrap_container(Bytes::from(wav), AudioFormat::linear16_8k()).unwrap();
        assert_eq!(pcm16_to_samples(&payload).unwrap(), vec![15, -20]);
    }

    #[test]
    fn test_unwrap_container_headerless_passthrough() {
        let raw = Bytes::from_static(&[0xFF, 0xFF, 0x7F]);
        let (payload, format) = unwrap_container(raw.clone(), AudioFormat::mulaw_8k()).unwrap();
        assert_eq!(payload, raw);
        assert_eq!(format, AudioFormat::mulaw_8k());
    }

    #[test]
    fn test_unwrap_container_mulaw_wav_falls_back_to_data_chunk() {
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(4u32 + 26 + 8 + 3).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&18u32.to_le_bytes());
        wav.extend_from_slice(&7u16.to_le_bytes()); // WAVE_FORMAT_MULAW
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&8u16.to_le_bytes());
        wav.extend_from_slice(&0u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&3u32.to_le_bytes());
        wav.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let (payload, format) =
            unwrap_container(Bytes::from(wav), AudioFormat::mulaw_8k()).unwrap();
        assert_eq!(&payload[..], &[0xAA, 0xBB, 0xCC]);
        assert_eq!(format, AudioFormat::mulaw_8k());
    }
}
