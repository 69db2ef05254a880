//! Engine module housing the host-facing spectrogram facade.
//!
//! `SpectrogramEngine` (in `core`) ties decoded instances, view controllers,
//! the render coordinator and its background worker together.

pub mod core;

pub use core::{AxisTicks, InstanceStatus, SpectrogramEngine, ViewState};
