//! Raw 16-bit little-endian mono PCM helpers.
//!
//! Microphone audio goes up at 16 kHz; speech comes back at 24 kHz. Both travel
//! base64-encoded inside JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::GenAiError;

pub const INPUT_SAMPLE_RATE: u32 = 16_000;
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Convert float samples in `[-1.0, 1.0]` to PCM16 little-endian bytes.
///
/// Out-of-range samples are clamped rather than wrapped.
#[must_use]
pub fn encode_f32(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let value = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

#[must_use]
pub fn encode_i16(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Parse PCM16 little-endian bytes.
///
/// # Errors
///
/// Returns [`GenAiError::Audio`] if the byte count is odd.
pub fn decode_i16(bytes: &[u8]) -> Result<Vec<i16>, GenAiError> {
    if bytes.len() % 2 != 0 {
        return Err(GenAiError::Audio(format!(
            "PCM16 payload has odd length {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[must_use]
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 PCM16 payload into samples.
///
/// # Errors
///
/// Returns [`GenAiError::Audio`] for invalid base64 or an odd byte count.
pub fn decode_base64_i16(data: &str) -> Result<Vec<i16>, GenAiError> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| GenAiError::Audio(format!("invalid base64: {e}")))?;
    decode_i16(&bytes)
}

/// Playback length in seconds of `sample_count` mono samples.
#[must_use]
pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let samples = sample_count as f64;
    samples / f64::from(sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_f32_clamps_out_of_range() {
        let bytes = encode_f32(&[2.0, -2.0, 0.0]);
        let samples = decode_i16(&bytes).unwrap();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX, 0]);
    }

    #[test]
    fn encode_f32_is_little_endian() {
        let bytes = encode_f32(&[1.0]);
        assert_eq!(bytes, vec![0xFF, 0x7F]);
    }

    #[test]
    fn decode_rejects_odd_length() {
        assert!(matches!(decode_i16(&[1, 2, 3]), Err(GenAiError::Audio(_))));
    }

    #[test]
    fn decode_base64_rejects_garbage() {
        assert!(matches!(
            decode_base64_i16("not base64!!"),
            Err(GenAiError::Audio(_))
        ));
    }

    #[test]
    fn base64_payload_decodes_to_samples() {
        let encoded = to_base64(&encode_i16(&[1, -1, 300]));
        assert_eq!(decode_base64_i16(&encoded).unwrap(), vec![1, -1, 300]);
    }

    #[test]
    fn duration_of_one_second_buffer() {
        assert!((duration_secs(24_000, OUTPUT_SAMPLE_RATE) - 1.0).abs() < f64::EPSILON);
        assert!((duration_secs(4_096, INPUT_SAMPLE_RATE) - 0.256).abs() < 1e-9);
    }
}
