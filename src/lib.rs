// spekview - zoomable spectrogram renderer
// FFT → frame extraction → row binning → dB palette, behind a coalescing
// render scheduler that keeps pan/zoom interaction off the compute path

// Module declarations
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod spectrum;
pub mod telemetry;
pub mod view;

// Re-exports for convenience
pub use audio::{AudioDecoder, AudioSource, DecodedAudio, WavDecoder};
pub use config::AppConfig;
pub use engine::{InstanceStatus, SpectrogramEngine};
pub use error::{DecodeError, ErrorCode, RenderError};
pub use render::{FrameReady, Geometry, InstanceId, PixelBuffer, RenderSnapshot};

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Install the global `tracing` subscriber (also receives `log` records)
///
/// Honors `RUST_LOG`, defaulting to `spekview=info`. Output goes to stderr so
/// CLI stdout stays machine-readable. Safe to call repeatedly.
pub fn init_logging() {
    LOGGING_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("spekview=info"))
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

        if let Err(err) = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .try_init()
        {
            eprintln!("[logging] failed to initialise tracing subscriber: {err}");
        }
    });
}
