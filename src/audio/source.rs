// AudioSource - immutable mono PCM handed to the render pipeline

use crate::error::DecodeError;

/// Decoded channel-0 samples plus their sample rate
///
/// Immutable once built; instances share it behind an `Arc` with the render
/// worker.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSource {
    /// # Errors
    /// `DecodeError::ZeroSampleRate` if `sample_rate` is 0.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::ZeroSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
