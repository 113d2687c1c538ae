//! PCM to WAV conversion for speech output.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hound::{SampleFormat, WavSpec, WavWriter};
use serde::Serialize;

use crate::error::{GenAiError, GenAiResult};

pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Raw 16-bit little-endian PCM as returned by the speech model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    pub fn mono(data: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            data,
            sample_rate,
            channels: 1,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        let frame_bytes = 2 * u64::from(self.channels.max(1));
        let frames = self.data.len() as u64 / frame_bytes;
        frames * 1000 / u64::from(self.sample_rate.max(1))
    }

    /// Encode as a WAV file.
    pub fn to_wav(&self) -> GenAiResult<Vec<u8>> {
        if self.data.len() % 2 != 0 {
            return Err(GenAiError::Audio(format!(
                "PCM payload has odd length {}",
                self.data.len()
            )));
        }

        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(self.data.len() + 44));
        {
            let mut writer =
                WavWriter::new(&mut cursor, spec).map_err(|e| GenAiError::Audio(e.to_string()))?;
            for sample in self.data.chunks_exact(2) {
                writer
                    .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                    .map_err(|e| GenAiError::Audio(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| GenAiError::Audio(e.to_string()))?;
        }
        Ok(cursor.into_inner())
    }
}

/// Read the sample rate out of a mime type like `audio/L16;codec=pcm;rate=24000`.
pub fn sample_rate_from_mime(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

/// A WAV clip ready to hand to a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioClip {
    /// `data:audio/wav;base64,...`
    pub media: String,
    pub duration_ms: u64,
    pub size_bytes: usize,
}

impl AudioClip {
    pub fn from_pcm(pcm: &PcmAudio) -> GenAiResult<Self> {
        let wav = pcm.to_wav()?;
        Ok(Self {
            media: format!("data:audio/wav;base64,{}", STANDARD.encode(&wav)),
            duration_ms: pcm.duration_ms(),
            size_bytes: wav.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone() -> PcmAudio {
        // 0.5s of a square-ish wave at 24kHz mono
        let data = (0..12_000u32)
            .flat_map(|i| {
                let sample: i16 = if (i / 60) % 2 == 0 { 8_000 } else { -8_000 };
                sample.to_le_bytes()
            })
            .collect();
        PcmAudio::mono(data, DEFAULT_SAMPLE_RATE)
    }

    #[test]
    fn test_wav_header_and_samples() {
        let pcm = tone();
        let wav = pcm.to_wav().unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 12_000);
    }

    #[test]
    fn test_duration() {
        assert_eq!(tone().duration_ms(), 500);
    }

    #[test]
    fn test_odd_payload_rejected() {
        let pcm = PcmAudio::mono(vec![0, 1, 2], DEFAULT_SAMPLE_RATE);
        assert!(matches!(pcm.to_wav(), Err(GenAiError::Audio(_))));
    }

    #[test]
    fn test_rate_from_mime() {
        assert_eq!(sample_rate_from_mime("audio/L16;codec=pcm;rate=24000"), Some(24_000));
        assert_eq!(sample_rate_from_mime("audio/L16"), None);
    }

    #[test]
    fn test_clip_is_data_uri() {
        let clip = AudioClip::from_pcm(&tone()).unwrap();
        assert!(clip.media.starts_with("data:audio/wav;base64,UklGR"));
        assert_eq!(clip.duration_ms, 500);
    }
}
