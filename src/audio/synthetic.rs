//! Synthetic sources - deterministic test signals
//!
//! Used by the CLI `synth` subcommand and by tests that need audio without
//! touching the filesystem. Every generator is a pure function of its
//! arguments; white noise takes an explicit seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::source::AudioSource;
use crate::error::DecodeError;

fn sample_count(duration_secs: f32, sample_rate: u32) -> usize {
    (duration_secs.max(0.0) * sample_rate as f32) as usize
}

/// Pure sine tone at `frequency` Hz with peak `amplitude`.
pub fn sine(
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> Result<AudioSource, DecodeError> {
    let n = sample_count(duration_secs, sample_rate);
    let omega = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate.max(1) as f64;
    let samples = (0..n)
        .map(|i| (amplitude as f64 * (omega * i as f64).sin()) as f32)
        .collect();
    AudioSource::new(samples, sample_rate)
}

/// All-zero source.
pub fn silence(duration_secs: f32, sample_rate: u32) -> Result<AudioSource, DecodeError> {
    AudioSource::new(vec![0.0; sample_count(duration_secs, sample_rate)], sample_rate)
}

/// Uniform white noise in `[-amplitude, amplitude)`.
pub fn white_noise(
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
    seed: u64,
) -> Result<AudioSource, DecodeError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amplitude = amplitude.abs();
    let samples = (0..sample_count(duration_secs, sample_rate))
        .map(|_| {
            if amplitude > 0.0 {
                rng.gen_range(-amplitude..amplitude)
            } else {
                0.0
            }
        })
        .collect();
    AudioSource::new(samples, sample_rate)
}
