//! RenderCoordinator: per-instance render state and the drain step.
//!
//! The UI side only posts snapshots into the mailbox. `drain()` is called by
//! the render worker once per frame interval; it takes every pending request,
//! runs the pass outside of any lock, and publishes the new buffer under the
//! instance lock. A buffer whose geometry no longer matches the instance's
//! current geometry, or whose request is older than the one already
//! published, is discarded instead of published. The sequence check keeps
//! last-write-wins when the worker and a caller (`drain_now`, export) drain
//! at the same time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::audio::AudioSource;
use crate::config::RenderConfig;
use crate::error::{log_render_error, RenderError};
use crate::telemetry::{self, SkipReason};

use super::buffer::PixelBuffer;
use super::mailbox::{PendingRequest, RenderMailbox};
use super::pass::{render_pass, RenderPlan};
use super::snapshot::{Geometry, InstanceId, RenderSnapshot};

const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Published after every successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReady {
    pub instance: InstanceId,
    pub width: u32,
    pub height: u32,
    pub coarse: bool,
}

/// Most recent published buffer together with the snapshot it was drawn from
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub snapshot: RenderSnapshot,
    pub buffer: Arc<PixelBuffer>,
}

/// Outcome counts for one drain step
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub rendered: usize,
    pub skipped: usize,
    pub discarded: usize,
}

impl DrainReport {
    pub fn is_idle(&self) -> bool {
        self.rendered == 0 && self.skipped == 0 && self.discarded == 0
    }
}

#[derive(Default)]
struct InstanceSlot {
    source: Option<Arc<AudioSource>>,
    plan: Option<Arc<RenderPlan>>,
    geometry: Geometry,
    frame: Option<RenderedFrame>,
    published_sequence: u64,
}

type SlotHandle = Arc<Mutex<InstanceSlot>>;

pub struct RenderCoordinator {
    instances: RwLock<HashMap<InstanceId, SlotHandle>>,
    mailbox: RenderMailbox,
    frames_tx: broadcast::Sender<FrameReady>,
    drag_step: usize,
}

impl RenderCoordinator {
    pub fn new(drag_step: usize) -> Self {
        let (frames_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        Self {
            instances: RwLock::new(HashMap::new()),
            mailbox: RenderMailbox::new(),
            frames_tx,
            drag_step: drag_step.max(1),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.drag_step_px as usize)
    }

    pub fn drag_step(&self) -> usize {
        self.drag_step
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // ========================================================================

    fn read_instances(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<InstanceId, SlotHandle>>, RenderError> {
        self.instances.read().map_err(|_| RenderError::LockPoisoned {
            component: "render_instances".to_string(),
        })
    }

    fn write_instances(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<InstanceId, SlotHandle>>, RenderError> {
        self.instances.write().map_err(|_| RenderError::LockPoisoned {
            component: "render_instances".to_string(),
        })
    }

    fn lock_slot(slot: &SlotHandle) -> Result<MutexGuard<'_, InstanceSlot>, RenderError> {
        slot.lock().map_err(|_| RenderError::LockPoisoned {
            component: "render_instance".to_string(),
        })
    }

    fn slot(&self, id: InstanceId) -> Result<SlotHandle, RenderError> {
        self.read_instances()?
            .get(&id)
            .cloned()
            .ok_or(RenderError::UnknownInstance { id: id.0 })
    }

    // ========================================================================
    // INSTANCE STATE
    // ========================================================================

    /// Register an instance with no audio and an empty layout
    pub fn register(&self, id: InstanceId) -> Result<(), RenderError> {
        self.write_instances()?
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(InstanceSlot::default())));
        Ok(())
    }

    /// Drop the instance and any request still pending for it
    pub fn unregister(&self, id: InstanceId) -> Result<bool, RenderError> {
        let removed = self.write_instances()?.remove(&id).is_some();
        self.mailbox.cancel(id)?;
        Ok(removed)
    }

    /// Attach decoded audio; builds the per-instance window and FFT plan
    pub fn attach_audio(&self, id: InstanceId, source: Arc<AudioSource>) -> Result<(), RenderError> {
        let slot = self.slot(id)?;
        let plan = Arc::new(RenderPlan::for_sample_rate(source.sample_rate()));
        let mut guard = Self::lock_slot(&slot)?;
        log::debug!(
            "[RenderCoordinator] {} audio attached: {} samples @ {} Hz, fft {}",
            id,
            source.len(),
            source.sample_rate(),
            plan.fft_size()
        );
        guard.source = Some(source);
        guard.plan = Some(plan);
        guard.frame = None;
        Ok(())
    }

    pub fn has_audio(&self, id: InstanceId) -> Result<bool, RenderError> {
        let slot = self.slot(id)?;
        let guard = Self::lock_slot(&slot)?;
        Ok(guard.source.is_some())
    }

    pub fn source(&self, id: InstanceId) -> Result<Option<Arc<AudioSource>>, RenderError> {
        let slot = self.slot(id)?;
        let guard = Self::lock_slot(&slot)?;
        Ok(guard.source.clone())
    }

    /// Record the instance's current layout; in-flight passes for any other
    /// geometry will be discarded at publish time
    ///
    /// A published buffer of a different size is dropped with it, so
    /// `latest_frame` never reports a buffer that doesn't match the plot.
    pub fn set_geometry(&self, id: InstanceId, geometry: Geometry) -> Result<(), RenderError> {
        let slot = self.slot(id)?;
        let mut guard = Self::lock_slot(&slot)?;
        if guard.geometry != geometry {
            guard.geometry = geometry;
            guard.frame = None;
        }
        Ok(())
    }

    pub fn geometry(&self, id: InstanceId) -> Result<Geometry, RenderError> {
        let slot = self.slot(id)?;
        let guard = Self::lock_slot(&slot)?;
        Ok(guard.geometry)
    }

    pub fn latest_frame(&self, id: InstanceId) -> Result<Option<RenderedFrame>, RenderError> {
        let slot = self.slot(id)?;
        let guard = Self::lock_slot(&slot)?;
        Ok(guard.frame.clone())
    }

    // ========================================================================
    // REQUESTS AND DRAIN
    // ========================================================================

    /// Post `snapshot` as the pending request for `id` (last write wins)
    pub fn request_render(&self, id: InstanceId, snapshot: RenderSnapshot) -> Result<(), RenderError> {
        self.slot(id)?;
        if self.mailbox.post(id, snapshot)? {
            tracing::debug!(instance = id.0, "render request coalesced");
            telemetry::hub().record_coalesced(id.0);
        }
        Ok(())
    }

    pub fn pending(&self) -> Result<usize, RenderError> {
        self.mailbox.pending()
    }

    /// Run at most one pass per instance with a pending request
    pub fn drain(&self) -> Result<DrainReport, RenderError> {
        let mut report = DrainReport::default();

        for (id, request) in self.mailbox.take_all()? {
            self.process(id, request, &mut report)?;
        }

        if !report.is_idle() {
            tracing::debug!(
                rendered = report.rendered,
                skipped = report.skipped,
                discarded = report.discarded,
                "render drain"
            );
        }

        Ok(report)
    }

    /// Render one taken request and publish it unless the layout moved on or
    /// a newer request already reached the slot
    fn process(
        &self,
        id: InstanceId,
        request: PendingRequest,
        report: &mut DrainReport,
    ) -> Result<(), RenderError> {
        let PendingRequest { sequence, snapshot } = request;
        let skip = |report: &mut DrainReport, reason: SkipReason| {
            report.skipped += 1;
            telemetry::hub().record_skip(id.0, reason);
        };

        let Ok(slot) = self.slot(id) else {
            skip(report, SkipReason::InstanceGone);
            return Ok(());
        };

        let (source, plan) = {
            let guard = Self::lock_slot(&slot)?;
            (guard.source.clone(), guard.plan.clone())
        };
        let (Some(source), Some(plan)) = (source, plan) else {
            skip(report, SkipReason::NoAudio);
            return Ok(());
        };

        let started = Instant::now();
        let buffer = match render_pass(&source, &plan, &snapshot, self.drag_step) {
            Ok(buffer) => buffer,
            Err(err) => {
                log_render_error(&err, "drain");
                skip(report, SkipReason::DegenerateLayout);
                return Ok(());
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;

        {
            let mut guard = Self::lock_slot(&slot)?;
            let rejected = if guard.geometry != snapshot.geometry {
                Some(SkipReason::StaleGeometry)
            } else if sequence < guard.published_sequence {
                Some(SkipReason::Superseded)
            } else {
                None
            };
            if let Some(reason) = rejected {
                log::debug!(
                    "[RenderCoordinator] {} discarding {}x{} buffer ({:?})",
                    id,
                    buffer.width(),
                    buffer.height(),
                    reason
                );
                report.discarded += 1;
                telemetry::hub().record_skip(id.0, reason);
                return Ok(());
            }
            guard.published_sequence = sequence;
            guard.frame = Some(RenderedFrame {
                snapshot,
                buffer: Arc::new(buffer),
            });
        }

        report.rendered += 1;
        let geometry = snapshot.geometry;
        telemetry::hub().record_render(
            id.0,
            geometry.plot_width,
            geometry.plot_height,
            snapshot.coarse,
            elapsed_ms,
        );
        // No receivers is fine
        let _ = self.frames_tx.send(FrameReady {
            instance: id,
            width: geometry.plot_width,
            height: geometry.plot_height,
            coarse: snapshot.coarse,
        });
        Ok(())
    }

    // ========================================================================
    // SUBSCRIPTIONS
    // ========================================================================

    pub fn subscribe(&self) -> broadcast::Receiver<FrameReady> {
        self.frames_tx.subscribe()
    }

    /// Frame notifications as a stream; lagged notifications are dropped
    pub fn frame_stream(&self) -> impl Stream<Item = FrameReady> + Unpin {
        BroadcastStream::new(self.subscribe()).filter_map(|item| item.ok())
    }
}
