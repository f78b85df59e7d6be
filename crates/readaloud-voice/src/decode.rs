//! Decoding synthesized audio payloads into playable PCM.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, Source};

use crate::error::DecodeError;

/// Interleaved f32 PCM ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub duration: Duration,
}

impl DecodedAudio {
    /// Wrap raw interleaved samples, computing the duration.
    #[must_use]
    pub fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let frames = (samples.len() / usize::from(channels.max(1))) as u128;
        let duration = if sample_rate == 0 {
            Duration::ZERO
        } else {
            let nanos = frames * 1_000_000_000 / u128::from(sample_rate);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };
        Self {
            samples,
            channels,
            sample_rate,
            duration,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode a WAV or MP3 payload.
pub fn decode_audio(bytes: Vec<u8>) -> Result<DecodedAudio, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let decoder =
        Decoder::new(Cursor::new(bytes)).map_err(|e| DecodeError::Unsupported(e.to_string()))?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

    if samples.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(DecodedAudio::from_samples(samples, channels, sample_rate))
}

/// Decode on the blocking pool so large payloads do not stall the runtime.
pub async fn decode_audio_async(bytes: Vec<u8>) -> Result<Arc<DecodedAudio>, DecodeError> {
    tokio::task::spawn_blocking(move || decode_audio(bytes))
        .await
        .map_err(|e| DecodeError::Unsupported(format!("decode task failed: {e}")))?
        .map(Arc::new)
}
