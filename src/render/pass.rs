// Render pass - audio + snapshot → pixel buffer
//
// One pass per drained request. Per screen column: position a frame with the
// column sampler, window it, transform it, then map each row's power through
// the dB palette. Coarse passes compute every `drag_step`-th column and
// replicate it to the right (clipped at the plot edge).

use std::sync::Arc;

use crate::audio::AudioSource;
use crate::error::RenderError;
use crate::spectrum::{
    color_for_db, fft_context, fft_size_for_rate, hann_window, normalization_db, power_to_db,
    transform, ColumnSampler, FftContext, FrameExtractor, FrequencyScale, RowMap,
};

use super::buffer::PixelBuffer;
use super::snapshot::RenderSnapshot;

/// Per-instance constants: FFT size, tables and window, built once at load
#[derive(Debug)]
pub struct RenderPlan {
    fft_size: usize,
    context: Arc<FftContext>,
    window: Vec<f32>,
}

impl RenderPlan {
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        let fft_size = fft_size_for_rate(sample_rate);
        Self {
            fft_size,
            context: fft_context(fft_size),
            window: hann_window(fft_size),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }
}

/// Run the full pipeline for one snapshot
///
/// # Errors
/// `RenderError::DegenerateLayout` if the plot has no area.
pub fn render_pass(
    source: &AudioSource,
    plan: &RenderPlan,
    snapshot: &RenderSnapshot,
    drag_step: usize,
) -> Result<PixelBuffer, RenderError> {
    let geometry = snapshot.geometry;
    geometry.ensure_drawable()?;

    let width = geometry.plot_width as usize;
    let height = geometry.plot_height as usize;
    let siz = plan.fft_size;
    let stride = if snapshot.coarse { drag_step.max(1) } else { 1 };

    let sampler = ColumnSampler::new(
        source.len(),
        snapshot.pan,
        snapshot.zoom,
        width,
        siz,
        stride,
    );
    let rows = RowMap::new(
        FrequencyScale::from_log_flag(snapshot.log_scale),
        height,
        siz,
        source.sample_rate(),
    );
    let extractor = FrameExtractor::new(source.samples(), &plan.window);
    let norm = normalization_db(siz);

    let mut buffer = PixelBuffer::new(geometry.plot_width, geometry.plot_height, color_for_db(f64::NAN));
    let mut real = vec![0.0f32; siz];
    let mut imag = vec![0.0f32; siz];
    let mut column = vec![[0u8; 4]; height];

    for px in (0..width).step_by(stride) {
        extractor.fill(sampler.offset(px), &mut real, &mut imag);
        transform(&plan.context, &mut real, &mut imag);

        for (row, slot) in column.iter_mut().enumerate() {
            *slot = color_for_db(power_to_db(rows.row_power(row, &real, &imag), norm));
        }

        for x in px..(px + stride).min(width) {
            for (y, color) in column.iter().enumerate() {
                buffer.set(x as u32, y as u32, *color);
            }
        }
    }

    tracing::debug!(
        width,
        height,
        fft_size = siz,
        stride,
        step = sampler.step(),
        "render pass complete"
    );

    Ok(buffer)
}
