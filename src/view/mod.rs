// View - interaction state and axis geometry for host UIs

pub mod axis;
pub mod controller;

pub use axis::{db_ticks, frequency_ticks, legend_color, time_label, time_ticks, Tick};
pub use controller::{DragState, ViewChange, ViewController, MAX_ZOOM, MIN_ZOOM};
