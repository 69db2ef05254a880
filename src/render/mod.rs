// Render - scheduling and pixel production
//
// Module organization:
// - snapshot: instance ids, plot geometry, immutable view snapshots
// - buffer: RGBA pixel buffer published per pass
// - pass: one full pipeline run (frames → FFT → rows → palette)
// - mailbox: single-slot, last-write-wins request queue
// - coordinator: per-instance state, drain step, frame notifications
// - worker: background thread draining on a fixed cadence
// - export: grid composite + PNG encoding

pub mod buffer;
pub mod coordinator;
pub mod export;
pub mod mailbox;
pub mod pass;
pub mod snapshot;
pub mod worker;

pub use buffer::PixelBuffer;
pub use coordinator::{DrainReport, FrameReady, RenderCoordinator, RenderedFrame};
pub use export::{composite_png, grid_dimensions};
pub use mailbox::{PendingRequest, RenderMailbox};
pub use pass::{render_pass, RenderPlan};
pub use snapshot::{Geometry, InstanceId, RenderSnapshot};
pub use worker::RenderWorker;
