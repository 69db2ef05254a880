// Frequency binning - FFT bins to pixel rows
//
// The row map is built once per render pass. Each row covers a fractional
// bin range `[low, high)`; rows are ordered top (highest frequency) to
// bottom. Reduction per row switches between interpolation (range narrower
// than one bin) and peak-hold (range spanning one or more bins).

use serde::{Deserialize, Serialize};

/// Lower bound of the logarithmic axis in Hz
pub const LOG_MIN_HZ: f64 = 20.0;
/// Upper bound of the logarithmic axis in Hz (further limited by Nyquist)
pub const LOG_MAX_HZ: f64 = 20_000.0;
/// Added to power before `log10` so silence maps to a finite value
pub const POWER_EPSILON: f64 = 1e-20;

/// Frequency axis scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyScale {
    Linear,
    Logarithmic,
}

impl FrequencyScale {
    pub fn from_log_flag(log: bool) -> Self {
        if log {
            FrequencyScale::Logarithmic
        } else {
            FrequencyScale::Linear
        }
    }
}

/// Fractional bin range covered by one pixel row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinRange {
    pub low: f64,
    pub high: f64,
}

/// Row → bin-range table for one pass
#[derive(Debug, Clone)]
pub struct RowMap {
    rows: Vec<BinRange>,
    bins: usize,
}

/// Highest frequency shown on a logarithmic axis for this sample rate
pub fn log_max_frequency(sample_rate: u32) -> f64 {
    (sample_rate as f64 / 2.0).min(LOG_MAX_HZ)
}

/// `20*log10(1/n)`, cancelling the unnormalized transform scale
pub fn normalization_db(fft_size: usize) -> f64 {
    20.0 * (1.0 / fft_size as f64).log10()
}

impl RowMap {
    /// Build the table for `height` rows
    ///
    /// # Arguments
    /// * `scale` - Linear or logarithmic frequency axis
    /// * `height` - Plot height in pixels (> 0)
    /// * `fft_size` - Transform length; `fft_size / 2` bins are usable
    /// * `sample_rate` - Needed for the logarithmic mapping
    pub fn new(scale: FrequencyScale, height: usize, fft_size: usize, sample_rate: u32) -> Self {
        let bins = fft_size / 2;
        let h = height as f64;

        let rows = match scale {
            FrequencyScale::Linear => {
                let per_row = bins as f64 / h;
                (0..height)
                    .map(|r| BinRange {
                        low: (h - r as f64 - 1.0) * per_row,
                        high: (h - r as f64) * per_row,
                    })
                    .collect()
            }
            FrequencyScale::Logarithmic => {
                let span = (log_max_frequency(sample_rate) / LOG_MIN_HZ).ln();
                let bins_per_hz = fft_size as f64 / sample_rate as f64;
                let top = (bins as f64 - 1.0).max(0.0);
                (0..height)
                    .map(|r| {
                        let r = r as f64;
                        let low = LOG_MIN_HZ * ((h - r - 1.0) / h * span).exp() * bins_per_hz;
                        let high = LOG_MIN_HZ * ((h - r) / h * span).exp() * bins_per_hz;
                        let high = high.min(top);
                        BinRange {
                            low: low.max(0.0).min(high),
                            high,
                        }
                    })
                    .collect()
            }
        };

        Self { rows, bins }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[BinRange] {
        &self.rows
    }

    /// Power for `row` given the transformed frame
    pub fn row_power(&self, row: usize, real: &[f32], imag: &[f32]) -> f64 {
        let BinRange { low, high } = self.rows[row];
        let bins = self.bins;
        let bin_power = |i: i64| -> f64 {
            if i >= 0 && (i as usize) < bins {
                let (re, im) = (real[i as usize] as f64, imag[i as usize] as f64);
                re * re + im * im
            } else {
                0.0
            }
        };

        if high - low < 1.0 {
            let centre = (low + high) * 0.5;
            let i = centre.floor();
            let mix = centre - i;
            let v1 = bin_power(i as i64);
            let v2 = bin_power(i as i64 + 1);
            v1 + mix * (v2 - v1)
        } else {
            let first = (low.floor() as i64).max(0) as usize;
            let last = (high.ceil() as usize).min(bins);
            (first..last)
                .map(|b| bin_power(b as i64))
                .fold(0.0, f64::max)
        }
    }
}

/// Convert a row power to dB with the given normalization
pub fn power_to_db(power: f64, normalization: f64) -> f64 {
    10.0 * (power + POWER_EPSILON).log10() + normalization
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ordered(map: &RowMap) {
        for (r, range) in map.rows().iter().enumerate() {
            assert!(range.low <= range.high, "row {} inverted: {:?}", r, range);
            if r + 1 < map.len() {
                let below = map.rows()[r + 1];
                assert!(
                    below.high <= range.low + 1e-9,
                    "rows {} and {} overlap: {:?} {:?}",
                    r,
                    r + 1,
                    range,
                    below
                );
            }
        }
    }

    #[test]
    fn test_linear_top_row_is_highest() {
        for (h, fft) in [(1usize, 2048usize), (7, 2048), (300, 4096), (5000, 2048)] {
            let map = RowMap::new(FrequencyScale::Linear, h, fft, 44_100);
            let bins = (fft / 2) as f64;
            assert!((map.rows()[0].high - bins).abs() < 1e-9);
            assert!(map.rows()[h - 1].low.abs() < 1e-9);
            assert_ordered(&map);
        }
    }

    #[test]
    fn test_log_rows_ordered_and_bounded() {
        for (h, fft, rate) in [
            (200usize, 2048usize, 44_100u32),
            (600, 4096, 48_000),
            (10_000, 2048, 44_100),
            (64, 8192, 192_000),
            (100, 2048, 8_000),
        ] {
            let map = RowMap::new(FrequencyScale::Logarithmic, h, fft, rate);
            assert_eq!(map.len(), h);
            assert_ordered(&map);
            let bottom = map.rows()[h - 1];
            let expected = LOG_MIN_HZ * fft as f64 / rate as f64;
            assert!((bottom.low - expected).abs() < 1e-9);
            assert!(map.rows()[0].high <= (fft / 2) as f64 - 1.0);
        }
    }

    #[test]
    fn test_peak_hold_takes_maximum() {
        // 8 bins squeezed into 2 rows
        let map = RowMap::new(FrequencyScale::Linear, 2, 16, 16);
        let mut real = vec![0.0f32; 16];
        let imag = vec![0.0f32; 16];
        real[1] = 2.0;
        real[2] = 3.0;
        real[6] = 1.0;
        // bottom row: bins [0, 4)
        assert_eq!(map.row_power(1, &real, &imag), 9.0);
        // top row: bins [4, 8)
        assert_eq!(map.row_power(0, &real, &imag), 1.0);
    }

    #[test]
    fn test_interpolates_narrow_rows() {
        // 4 bins stretched over 16 rows
        let map = RowMap::new(FrequencyScale::Linear, 16, 8, 8);
        let real = vec![0.0f32, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0];
        let imag = vec![0.0f32; 8];
        // bottom row covers [0, 0.25): centre 0.125 → between bins 0 and 1
        let p = map.row_power(15, &real, &imag);
        assert!((p - 0.125).abs() < 1e-9);
        // row covering [1.0, 1.25): centre 1.125 → 1 + 0.125 * (4 - 1)
        let p = map.row_power(11, &real, &imag);
        assert!((p - 1.375).abs() < 1e-9);
    }

    #[test]
    fn test_interpolation_ignores_bins_past_nyquist() {
        let map = RowMap::new(FrequencyScale::Linear, 16, 8, 8);
        let real = vec![0.0f32, 0.0, 0.0, 2.0, 5.0, 5.0, 5.0, 5.0];
        let imag = vec![0.0f32; 8];
        // top row [3.75, 4): centre 3.875 → v1 = 4, v2 = 0 (bin 4 out of range)
        let p = map.row_power(0, &real, &imag);
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_power_to_db_floors_silence() {
        let db = power_to_db(0.0, normalization_db(2048));
        assert!(db.is_finite());
        assert!(db < -200.0);
        assert!((normalization_db(2048) + 66.2266).abs() < 1e-3);
    }
}
