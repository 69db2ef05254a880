// Render snapshots - immutable copies of view state handed to the worker

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::RenderError;

/// Opaque handle for one spectrogram surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Plot rectangle inside its canvas, in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub plot_x: u32,
    pub plot_y: u32,
    pub plot_width: u32,
    pub plot_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Geometry {
    pub fn new(
        plot_x: u32,
        plot_y: u32,
        plot_width: u32,
        plot_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Self {
        Self {
            plot_x,
            plot_y,
            plot_width,
            plot_height,
            canvas_width,
            canvas_height,
        }
    }

    /// Derive the plot rectangle from a container size in CSS pixels
    ///
    /// The canvas is the container scaled by `dpr`; the plot is inset by the
    /// configured margins (also scaled by `dpr`). Negative sizes collapse to 0.
    pub fn from_container(css_width: f64, css_height: f64, dpr: f64, layout: &LayoutConfig) -> Self {
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        let fw = (css_width.max(0.0) * dpr).floor();
        let fh = (css_height.max(0.0) * dpr).floor();
        let px = |v: f64| v.max(0.0).floor() as u32;

        Self {
            plot_x: px(layout.left * dpr),
            plot_y: px(layout.top * dpr),
            plot_width: px(fw - (layout.left + layout.right) * dpr),
            plot_height: px(fh - (layout.top + layout.bottom) * dpr),
            canvas_width: fw as u32,
            canvas_height: fh as u32,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.plot_width == 0 || self.plot_height == 0
    }

    /// `Err(DegenerateLayout)` when there is nothing to draw into
    pub fn ensure_drawable(&self) -> Result<(), RenderError> {
        if self.is_degenerate() {
            return Err(RenderError::DegenerateLayout {
                width: self.plot_width,
                height: self.plot_height,
            });
        }
        Ok(())
    }
}

/// Everything a render pass needs from the view, copied at request time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub geometry: Geometry,
    /// Visible duration = total / zoom, zoom in [1, 64]
    pub zoom: f64,
    /// Left edge of the visible window, in [0, 1 - 1/zoom]
    pub pan: f64,
    pub log_scale: bool,
    /// Drag-quality pass (one FFT column per `drag_step_px` screen columns)
    pub coarse: bool,
}

impl RenderSnapshot {
    pub fn full_view(geometry: Geometry) -> Self {
        Self {
            geometry,
            zoom: 1.0,
            pan: 0.0,
            log_scale: false,
            coarse: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_container_default_margins() {
        let g = Geometry::from_container(800.0, 400.0, 1.0, &LayoutConfig::default());
        assert_eq!(g, Geometry::new(40, 30, 704, 350, 800, 400));
    }

    #[test]
    fn test_from_container_scales_with_dpr() {
        let g = Geometry::from_container(800.0, 400.0, 2.0, &LayoutConfig::default());
        assert_eq!(g.plot_x, 80);
        assert_eq!(g.plot_y, 60);
        assert_eq!(g.plot_width, 1600 - 192);
        assert_eq!(g.plot_height, 800 - 100);
        assert_eq!((g.canvas_width, g.canvas_height), (1600, 800));
    }

    #[test]
    fn test_tiny_container_is_degenerate() {
        let g = Geometry::from_container(50.0, 30.0, 1.0, &LayoutConfig::default());
        assert_eq!(g.plot_width, 0);
        assert_eq!(g.plot_height, 0);
        assert!(g.is_degenerate());
        assert_eq!(
            g.ensure_drawable(),
            Err(RenderError::DegenerateLayout {
                width: 0,
                height: 0
            })
        );
    }

    #[test]
    fn test_invalid_dpr_falls_back_to_one() {
        let g = Geometry::from_container(200.0, 100.0, f64::NAN, &LayoutConfig::default());
        assert_eq!(g.canvas_width, 200);
        assert_eq!(g.plot_width, 104);
    }

    #[test]
    fn test_instance_id_display() {
        assert_eq!(InstanceId(12).to_string(), "#12");
    }
}
