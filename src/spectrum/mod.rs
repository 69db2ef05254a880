// Spectrum - spectral analysis building blocks for the render pipeline
//
// Module organization:
// - fft: radix-2 transform and the process-wide table cache
// - frame: FFT size selection, Hann window, column → frame extraction
// - binning: FFT bins → pixel rows (linear / logarithmic axis), power → dB
// - palette: dB → 256-entry RGBA palette
//
// Everything here is pure and allocation-light; the render pass in
// `crate::render::pass` strings these pieces together per column.

pub mod binning;
pub mod fft;
pub mod frame;
pub mod palette;

pub use binning::{
    log_max_frequency, normalization_db, power_to_db, BinRange, FrequencyScale, RowMap,
    LOG_MAX_HZ, LOG_MIN_HZ,
};
pub use fft::{fft_context, transform, FftContext};
pub use frame::{fft_size_for_rate, hann_window, ColumnSampler, FrameExtractor};
pub use palette::{color_for_db, db_to_index, palette, Rgba, MAX_DB, MIN_DB};
