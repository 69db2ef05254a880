//! Configuration management for the spectrogram renderer
//!
//! Runtime configuration is loaded from a JSON file so hosts can tune the
//! scheduler cadence, drag resolution and layout margins without
//! recompilation. The display range and frequency bounds of the spectrogram
//! itself are fixed and are not read from this file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Render scheduler and export parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Drain cadence of the render worker (one display refresh)
    pub frame_interval_ms: u64,
    /// Screen columns sharing one FFT column while dragging
    pub drag_step_px: u32,
    /// Maximum composite export size per axis, in pixels
    pub export_max_dimension: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            drag_step_px: 4,
            export_max_dimension: 4096,
        }
    }
}

/// Pan/zoom limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Upper zoom bound (lower bound is always 1)
    pub max_zoom: f64,
    /// Zoom factor per wheel notch (`wheel_zoom`, CLI `--zoom-steps`); must exceed 1
    pub wheel_zoom_factor: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            max_zoom: 64.0,
            wheel_zoom_factor: 1.25,
        }
    }
}

/// Margins around the plot area in CSS pixels (scaled by the device pixel ratio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Space for the frequency axis
    pub left: f64,
    /// Space for the title and info line
    pub top: f64,
    /// Space for the dB legend
    pub right: f64,
    /// Space for the time axis
    pub bottom: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left: 40.0,
            top: 30.0,
            right: 56.0,
            bottom: 20.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// not valid JSON (a warning is logged in both cases).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/spekview.json")
    }
}
