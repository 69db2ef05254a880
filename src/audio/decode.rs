// Decoding collaborator - container bytes to channel-0 PCM
//
// Only WAV is decoded in-crate (via hound). Every other container sniffed by
// `super::sniff` is reported as unsupported so the instance shows a status
// line instead of a spectrogram.

use std::io::Cursor;

use super::sniff::ContainerKind;
use super::source::AudioSource;
use crate::error::DecodeError;

/// Output of a decoder: channel 0 plus the stream's shape
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Channel 0, normalized to [-1, 1]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source stream (only channel 0 is kept)
    pub channel_count: u16,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn into_source(self) -> Result<AudioSource, DecodeError> {
        AudioSource::new(self.samples, self.sample_rate)
    }
}

/// Trait implemented by audio decoders
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio, DecodeError>;
}

/// RIFF/WAVE decoder backed by hound
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
        let kind = ContainerKind::detect(bytes, None);
        if kind != ContainerKind::Wav {
            return Err(DecodeError::Unsupported {
                reason: format!("{} container", kind.label()),
            });
        }

        let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(DecodeError::ZeroSampleRate);
        }
        let channels = spec.channels.max(1) as usize;

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => {
                if spec.bits_per_sample != 32 {
                    return Err(DecodeError::Unsupported {
                        reason: format!("{}-bit float WAV", spec.bits_per_sample),
                    });
                }
                reader
                    .samples::<f32>()
                    .step_by(channels)
                    .collect::<Result<Vec<f32>, _>>()?
            }
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(DecodeError::Unsupported {
                        reason: format!("{}-bit integer WAV", spec.bits_per_sample),
                    });
                }
                let max = ((1i64 << (spec.bits_per_sample - 1)) - 1).max(1) as f32;
                reader
                    .samples::<i32>()
                    .step_by(channels)
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()?
            }
        };

        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }

        log::debug!(
            "[WavDecoder] Decoded {} frames at {} Hz ({} ch, {} bit)",
            samples.len(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample
        );

        Ok(DecodedAudio {
            samples,
            sample_rate: spec.sample_rate,
            channel_count: spec.channels,
        })
    }
}
