// Frame extraction - one windowed, DC-removed frame per output column
//
// A render pass maps each plot column to a frame centre in the visible
// portion of the audio. The frame is read with zero padding outside the
// sample range, its mean is removed, and the periodic Hann window applied.

use std::f64::consts::PI;

/// Pick the transform size from the sample rate
///
/// Higher rates get longer frames so the frequency resolution per bin stays
/// in the same ballpark (~21 Hz).
pub fn fft_size_for_rate(sample_rate: u32) -> usize {
    if sample_rate > 88_200 {
        8192
    } else if sample_rate > 44_100 {
        4096
    } else {
        2048
    }
}

/// Periodic Hann window, `w[i] = 0.5 * (1 - cos(2*pi*i/n))`
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos())) as f32)
        .collect()
}

/// Column → sample offset mapping for one render pass
///
/// Captures the pan/zoom state at construction so every column of a pass is
/// positioned against the same snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSampler {
    start: i64,
    step: f64,
    half: i64,
    stride: usize,
}

impl ColumnSampler {
    /// # Arguments
    /// * `len` - Total sample count
    /// * `pan` - Left edge of the visible window as a fraction of the duration
    /// * `zoom` - Zoom factor (visible duration = total / zoom)
    /// * `width` - Plot width in pixels (> 0)
    /// * `fft_size` - Frame length
    /// * `stride` - Screen columns per computed column (1, or 4 while dragging)
    pub fn new(
        len: usize,
        pan: f64,
        zoom: f64,
        width: usize,
        fft_size: usize,
        stride: usize,
    ) -> Self {
        debug_assert!(width > 0, "plot width must be positive");
        let len_f = len as f64;
        let start = (pan * len_f).floor() as i64;
        let end = ((pan + 1.0 / zoom) * len_f).floor() as i64;
        let per_px = ((end - start) as f64 / width as f64).trunc();

        Self {
            start,
            step: per_px.max(1.0),
            half: (fft_size / 2) as i64,
            stride: stride.max(1),
        }
    }

    /// Samples advanced per screen column
    pub fn step(&self) -> usize {
        self.step as usize
    }

    /// Screen columns covered by each computed column
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// First sample of the frame for column `px` (may be negative)
    pub fn offset(&self, px: usize) -> i64 {
        let centre = (px as f64 + (self.stride as f64 - 1.0) / 2.0) * self.step;
        self.start + centre.round() as i64 - self.half
    }
}

/// Reads windowed frames out of a sample buffer
pub struct FrameExtractor<'a> {
    samples: &'a [f32],
    window: &'a [f32],
}

impl<'a> FrameExtractor<'a> {
    pub fn new(samples: &'a [f32], window: &'a [f32]) -> Self {
        Self { samples, window }
    }

    /// Fill `real`/`imag` with the frame starting at `offset`
    ///
    /// Indices outside the sample range read as zero. The DC estimate is the
    /// mean over the whole frame including those zeros, taken before
    /// windowing. `imag` is cleared.
    pub fn fill(&self, offset: i64, real: &mut [f32], imag: &mut [f32]) {
        let siz = self.window.len();
        debug_assert_eq!(real.len(), siz);
        debug_assert_eq!(imag.len(), siz);

        let len = self.samples.len() as i64;
        let mut dc = 0.0f64;
        for (i, slot) in real.iter_mut().enumerate() {
            let idx = offset + i as i64;
            let v = if idx >= 0 && idx < len {
                self.samples[idx as usize]
            } else {
                0.0
            };
            *slot = v;
            dc += v as f64;
        }
        let dc = (dc / siz as f64) as f32;

        for ((r, im), w) in real.iter_mut().zip(imag.iter_mut()).zip(self.window) {
            *r = (*r - dc) * w;
            *im = 0.0;
        }
    }
}
