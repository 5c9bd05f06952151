use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Interleaved 16-bit PCM audio held in memory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioClip {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub pcm_i16: Vec<i16>,
}

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("pcm byte length must be a multiple of 2, got {0}")]
    OddPcmLength(usize),

    #[error("sample rate must be > 0")]
    ZeroSampleRate,

    #[error("channel count must be > 0")]
    ZeroChannels,

    #[error("only 16-bit integer wav input is supported")]
    UnsupportedWavFormat,

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
}

impl AudioClip {
    /// Build a clip from raw little-endian i16 PCM bytes, the shape audio
    /// arrives in from capture devices.
    pub fn from_pcm_bytes(raw: &[u8], sample_rate_hz: u32, channels: u16) -> Result<Self, AudioError> {
        if sample_rate_hz == 0 {
            return Err(AudioError::ZeroSampleRate);
        }
        if channels == 0 {
            return Err(AudioError::ZeroChannels);
        }
        if !raw.len().is_multiple_of(2usize) {
            return Err(AudioError::OddPcmLength(raw.len()));
        }
        let pcm_i16 = raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(Self {
            sample_rate_hz,
            channels,
            pcm_i16,
        })
    }

    pub fn from_wav_bytes(raw: &[u8]) -> Result<Self, AudioError> {
        let mut reader = hound::WavReader::new(Cursor::new(raw))?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(AudioError::UnsupportedWavFormat);
        }
        let pcm_i16 = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, hound::Error>>()?;
        Ok(Self {
            sample_rate_hz: spec.sample_rate,
            channels: spec.channels,
            pcm_i16,
        })
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.pcm_i16.len() / usize::from(self.channels)
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate_hz == 0 {
            return 0;
        }
        (self.frames() as u64).saturating_mul(1_000) / u64::from(self.sample_rate_hz)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate_hz)
    }

    /// Copy out the samples between two millisecond offsets. Out-of-range
    /// offsets clamp to the clip length.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> AudioClip {
        let step = usize::from(self.channels.max(1));
        let to_index = |ms: u64| -> usize {
            let frame = (u128::from(ms) * u128::from(self.sample_rate_hz) / 1_000) as usize;
            frame.saturating_mul(step).min(self.pcm_i16.len())
        };
        let begin = to_index(start_ms);
        let end = to_index(end_ms).max(begin);
        AudioClip {
            sample_rate_hz: self.sample_rate_hz,
            channels: self.channels,
            pcm_i16: self.pcm_i16[begin..end].to_vec(),
        }
    }

    pub fn to_wav_bytes(&self) -> Result<Bytes, AudioError> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.pcm_i16 {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(Bytes::from(cursor.into_inner()))
    }
}
