//! Pan/zoom state machine driven by pointer input.
//!
//! Domain invariant: `zoom ∈ [1, max_zoom]` and `pan ∈ [0, 1 - 1/zoom]` after
//! every operation. The controller never renders; callers turn the returned
//! [`ViewChange`] into coarse or full render requests.

use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;

/// Zoom bounds
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 64.0;

const DEFAULT_WHEEL_FACTOR: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DragState {
    Idle,
    Dragging { origin_x: f64, origin_pan: f64 },
}

/// What a pointer event asks the renderer for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewChange {
    None,
    /// Drag in progress: a fast, column-replicated pass
    Coarse,
    /// Settled view: a full-resolution pass
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewController {
    zoom: f64,
    pan: f64,
    max_zoom: f64,
    wheel_factor: f64,
    drag: DragState,
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new(MAX_ZOOM)
    }
}

impl ViewController {
    /// `max_zoom` is clamped to `[1, 64]`
    pub fn new(max_zoom: f64) -> Self {
        let max_zoom = if max_zoom.is_finite() {
            max_zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MAX_ZOOM
        };
        Self {
            zoom: MIN_ZOOM,
            pan: 0.0,
            max_zoom,
            wheel_factor: DEFAULT_WHEEL_FACTOR,
            drag: DragState::Idle,
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        let mut view = Self::new(config.max_zoom);
        if config.wheel_zoom_factor.is_finite() && config.wheel_zoom_factor > 1.0 {
            view.wheel_factor = config.wheel_zoom_factor;
        }
        view
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Largest pan for the current zoom
    pub fn max_pan(&self) -> f64 {
        (1.0 - 1.0 / self.zoom).max(0.0)
    }

    fn clamp_pan(&self, pan: f64) -> f64 {
        if pan.is_nan() {
            return 0.0;
        }
        pan.clamp(0.0, self.max_pan())
    }

    /// Multiply zoom by `factor`, keeping the view centre fixed
    ///
    /// Non-finite or non-positive factors are ignored. Returns whether the
    /// view changed.
    pub fn set_zoom(&mut self, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, self.max_zoom);
        let centre = self.pan + 0.5 / self.zoom;
        let (old_zoom, old_pan) = (self.zoom, self.pan);

        self.zoom = new_zoom;
        self.pan = self.clamp_pan(centre - 0.5 / new_zoom);
        old_zoom != self.zoom || old_pan != self.pan
    }

    /// Zoom by whole or fractional wheel notches; positive zooms in
    pub fn wheel(&mut self, notches: f64) -> bool {
        self.set_zoom(self.wheel_factor.powf(notches))
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = MIN_ZOOM;
        self.pan = 0.0;
    }

    pub fn set_pan(&mut self, fraction: f64) {
        self.pan = self.clamp_pan(fraction);
    }

    /// idle → dragging, only when zoomed in and audio is loaded
    pub fn pointer_down(&mut self, x: f64, has_audio: bool) -> bool {
        if self.zoom <= MIN_ZOOM || !has_audio || self.is_dragging() {
            return false;
        }
        self.drag = DragState::Dragging {
            origin_x: x,
            origin_pan: self.pan,
        };
        true
    }

    /// Update pan from the pointer's travel since `pointer_down`
    pub fn pointer_move(&mut self, x: f64, plot_width: f64) -> ViewChange {
        let DragState::Dragging {
            origin_x,
            origin_pan,
        } = self.drag
        else {
            return ViewChange::None;
        };
        if plot_width.is_nan() || plot_width <= 0.0 || !x.is_finite() {
            return ViewChange::None;
        }

        let dx = x - origin_x;
        self.pan = self.clamp_pan(origin_pan - (dx / plot_width) / self.zoom);
        ViewChange::Coarse
    }

    /// dragging → idle; asks for one full-resolution pass
    pub fn pointer_up(&mut self) -> ViewChange {
        if self.is_dragging() {
            self.drag = DragState::Idle;
            ViewChange::Full
        } else {
            ViewChange::None
        }
    }

    pub fn pointer_cancel(&mut self) -> ViewChange {
        self.pointer_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_in_domain(view: &ViewController) {
        assert!(view.zoom() >= MIN_ZOOM && view.zoom() <= MAX_ZOOM);
        assert!(view.pan() >= 0.0, "pan {}", view.pan());
        assert!(
            view.pan() <= 1.0 - 1.0 / view.zoom() + 1e-12,
            "pan {} zoom {}",
            view.pan(),
            view.zoom()
        );
    }

    #[test]
    fn test_zoom_keeps_centre() {
        let mut view = ViewController::default();
        view.set_zoom(4.0);
        assert_eq!(view.zoom(), 4.0);
        assert!((view.pan() - 0.375).abs() < 1e-12);

        view.set_pan(0.5);
        view.set_zoom(2.0);
        // centre was 0.5 + 0.125 = 0.625
        assert!((view.pan() + 0.5 / 8.0 - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = ViewController::default();
        view.set_zoom(1000.0);
        assert_eq!(view.zoom(), MAX_ZOOM);
        view.set_zoom(1e-6);
        assert_eq!(view.zoom(), MIN_ZOOM);
        assert_eq!(view.pan(), 0.0);
        assert!(!view.set_zoom(f64::NAN));
        assert!(!view.set_zoom(-2.0));
    }

    #[test]
    fn test_config_max_zoom() {
        let view = ViewController::from_config(&ViewConfig {
            max_zoom: 8.0,
            ..ViewConfig::default()
        });
        let mut view = view;
        view.set_zoom(100.0);
        assert_eq!(view.zoom(), 8.0);
        assert_eq!(ViewController::new(500.0).max_zoom, MAX_ZOOM);
    }

    #[test]
    fn test_wheel_uses_configured_factor() {
        let mut view = ViewController::from_config(&ViewConfig {
            wheel_zoom_factor: 2.0,
            ..ViewConfig::default()
        });
        assert!(view.wheel(3.0));
        assert!((view.zoom() - 8.0).abs() < 1e-9);
        assert!(view.wheel(-1.0));
        assert!((view.zoom() - 4.0).abs() < 1e-9);

        let mut fallback = ViewController::from_config(&ViewConfig {
            wheel_zoom_factor: 0.5,
            ..ViewConfig::default()
        });
        fallback.wheel(1.0);
        assert!((fallback.zoom() - 1.25).abs() < 1e-9);
        fallback.wheel(-4.0);
        assert_eq!(fallback.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_reset_zoom() {
        let mut view = ViewController::default();
        view.set_zoom(16.0);
        view.set_pan(0.9);
        view.reset_zoom();
        assert_eq!((view.zoom(), view.pan()), (1.0, 0.0));
    }

    #[test]
    fn test_drag_requires_zoom_and_audio() {
        let mut view = ViewController::default();
        assert!(!view.pointer_down(10.0, true));
        view.set_zoom(2.0);
        assert!(!view.pointer_down(10.0, false));
        assert!(view.pointer_down(10.0, true));
        assert!(view.is_dragging());
    }

    #[test]
    fn test_drag_pans_opposite_to_pointer() {
        let mut view = ViewController::default();
        view.set_zoom(4.0);
        view.set_pan(0.5);
        view.pointer_down(100.0, true);

        // dragging right by a quarter of the plot reveals earlier audio
        assert_eq!(view.pointer_move(150.0, 200.0), ViewChange::Coarse);
        assert!((view.pan() - (0.5 - 0.25 / 4.0)).abs() < 1e-12);

        // far left clamps at the end
        view.pointer_move(-10_000.0, 200.0);
        assert_eq!(view.pan(), 0.75);

        assert_eq!(view.pointer_up(), ViewChange::Full);
        assert_eq!(view.pointer_up(), ViewChange::None);
        assert_eq!(view.pointer_move(0.0, 200.0), ViewChange::None);
    }

    #[test]
    fn test_cancel_ends_drag_with_full_pass() {
        let mut view = ViewController::default();
        view.set_zoom(2.0);
        view.pointer_down(0.0, true);
        assert_eq!(view.pointer_cancel(), ViewChange::Full);
        assert_eq!(view.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_domain_holds_under_random_operations() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut view = ViewController::default();

        for _ in 0..5_000 {
            match rng.gen_range(0..6) {
                0 => {
                    view.set_zoom(rng.gen_range(0.1..10.0));
                }
                1 => view.set_pan(rng.gen_range(-2.0..2.0)),
                2 => {
                    view.pointer_down(rng.gen_range(0.0..500.0), true);
                }
                3 => {
                    view.pointer_move(rng.gen_range(-2000.0..2000.0), 500.0);
                }
                4 => {
                    view.pointer_up();
                }
                _ => {
                    if rng.gen_bool(0.05) {
                        view.reset_zoom();
                    }
                }
            }
            assert_in_domain(&view);
        }
    }
}
