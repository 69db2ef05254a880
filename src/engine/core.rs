//! SpectrogramEngine: the facade hosts drive.
//!
//! Owns per-instance view state and status, the shared render coordinator,
//! the global log-scale flag, and the background render worker. Every view
//! mutation turns into a snapshot posted to the coordinator; nothing here
//! blocks on a render pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::{
    sniff, stream_summary, AudioDecoder, AudioMetadata, AudioSource, WavDecoder,
};
use crate::config::AppConfig;
use crate::error::{log_decode_error, DecodeError, ErrorCode, RenderError};
use crate::render::{
    composite_png, DrainReport, Geometry, InstanceId, RenderCoordinator, RenderSnapshot,
    RenderWorker, RenderedFrame,
};
use crate::telemetry::{self, LifecyclePhase};
use crate::view::{db_ticks, frequency_ticks, time_ticks, Tick, ViewChange, ViewController};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// What the host shows in place of (or above) the spectrogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Loading,
    Ready { info: String },
    Failed { message: String },
}

impl InstanceStatus {
    fn failed(err: &DecodeError) -> Self {
        InstanceStatus::Failed {
            message: format!("Error : {}", err.message()),
        }
    }
}

/// Zoom, pan and drag flag as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub zoom: f64,
    pub pan: f64,
    pub dragging: bool,
}

/// Tick sets for the three axes of one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTicks {
    pub frequency: Vec<Tick>,
    pub time: Vec<Tick>,
    pub db: Vec<Tick>,
}

struct InstanceState {
    view: ViewController,
    geometry: Geometry,
    status: InstanceStatus,
    metadata: Option<AudioMetadata>,
}

type StateHandle = Arc<Mutex<InstanceState>>;

pub struct SpectrogramEngine {
    config: AppConfig,
    coordinator: Arc<RenderCoordinator>,
    instances: RwLock<HashMap<InstanceId, StateHandle>>,
    decoder: Arc<dyn AudioDecoder>,
    next_id: AtomicU64,
    log_scale: AtomicBool,
    worker: Mutex<Option<RenderWorker>>,
}

impl Default for SpectrogramEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrogramEngine {
    /// Engine with configuration from `assets/spekview.json` (or defaults)
    pub fn new() -> Self {
        Self::with_config(AppConfig::load())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_decoder(config, Arc::new(WavDecoder))
    }

    pub fn with_decoder(config: AppConfig, decoder: Arc<dyn AudioDecoder>) -> Self {
        let coordinator = Arc::new(RenderCoordinator::from_config(&config.render));
        Self {
            config,
            coordinator,
            instances: RwLock::new(HashMap::new()),
            decoder,
            next_id: AtomicU64::new(1),
            log_scale: AtomicBool::new(false),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<RenderCoordinator> {
        &self.coordinator
    }

    // ========================================================================
    // LOCK HELPER METHODS
    // ========================================================================

    fn read_instances(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<InstanceId, StateHandle>>, RenderError> {
        self.instances.read().map_err(|_| RenderError::LockPoisoned {
            component: "engine_instances".to_string(),
        })
    }

    fn write_instances(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<InstanceId, StateHandle>>, RenderError> {
        self.instances.write().map_err(|_| RenderError::LockPoisoned {
            component: "engine_instances".to_string(),
        })
    }

    fn lock_state(state: &StateHandle) -> Result<MutexGuard<'_, InstanceState>, RenderError> {
        state.lock().map_err(|_| RenderError::LockPoisoned {
            component: "engine_instance".to_string(),
        })
    }

    fn lock_worker(&self) -> Result<MutexGuard<'_, Option<RenderWorker>>, RenderError> {
        self.worker.lock().map_err(|_| RenderError::LockPoisoned {
            component: "render_worker".to_string(),
        })
    }

    fn state(&self, id: InstanceId) -> Result<StateHandle, RenderError> {
        self.read_instances()?
            .get(&id)
            .cloned()
            .ok_or(RenderError::UnknownInstance { id: id.0 })
    }

    // ========================================================================
    // INSTANCE LIFECYCLE
    // ========================================================================

    fn register(&self, status: InstanceStatus) -> Result<InstanceId, RenderError> {
        let id = InstanceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.coordinator.register(id)?;
        let state = InstanceState {
            view: ViewController::from_config(&self.config.view),
            geometry: Geometry::default(),
            status,
            metadata: None,
        };
        self.write_instances()?
            .insert(id, Arc::new(Mutex::new(state)));
        telemetry::hub().record_lifecycle(LifecyclePhase::InstanceCreated);
        log::info!("[SpectrogramEngine] instance {} created", id);
        Ok(id)
    }

    /// New instance over already-decoded audio
    pub fn create_instance(&self, audio: AudioSource) -> Result<InstanceId, RenderError> {
        let info = stream_summary(audio.sample_rate(), 1, audio.duration_secs());
        let id = self.register(InstanceStatus::Ready { info })?;
        self.coordinator.attach_audio(id, Arc::new(audio))?;
        Ok(id)
    }

    /// New instance waiting for `load_bytes`
    pub fn create_pending_instance(&self) -> Result<InstanceId, RenderError> {
        self.register(InstanceStatus::Loading)
    }

    /// Decode `bytes` into instance `id`
    ///
    /// Decode failures do not surface as errors: they become the instance's
    /// `Failed` status and leave other instances untouched. The returned
    /// status is the instance's new status.
    pub fn load_bytes(
        &self,
        id: InstanceId,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<InstanceStatus, RenderError> {
        let state = self.state(id)?;
        let metadata = sniff(bytes, extension);

        let status = match self
            .decoder
            .decode(bytes)
            .and_then(|decoded| {
                let info = metadata.summary(&decoded, bytes.len());
                decoded.into_source().map(|source| (source, info))
            }) {
            Ok((source, info)) => {
                self.coordinator.attach_audio(id, Arc::new(source))?;
                InstanceStatus::Ready { info }
            }
            Err(err) => {
                log_decode_error(&err, &format!("load_bytes {}", id));
                telemetry::hub().record_decode_failure(id.0, err.code(), err.message());
                InstanceStatus::failed(&err)
            }
        };

        {
            let mut guard = Self::lock_state(&state)?;
            guard.status = status.clone();
            guard.metadata = Some(metadata);
        }

        if matches!(status, InstanceStatus::Ready { .. }) {
            self.schedule(id, false)?;
        }
        Ok(status)
    }

    /// `create_pending_instance` + `load_bytes`
    pub fn open_bytes(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<(InstanceId, InstanceStatus), RenderError> {
        let id = self.create_pending_instance()?;
        let status = self.load_bytes(id, bytes, extension)?;
        Ok((id, status))
    }

    pub fn destroy_instance(&self, id: InstanceId) -> Result<(), RenderError> {
        if self.write_instances()?.remove(&id).is_none() {
            return Err(RenderError::UnknownInstance { id: id.0 });
        }
        self.coordinator.unregister(id)?;
        telemetry::hub().record_lifecycle(LifecyclePhase::InstanceDestroyed);
        log::info!("[SpectrogramEngine] instance {} destroyed", id);
        Ok(())
    }

    pub fn instance_ids(&self) -> Result<Vec<InstanceId>, RenderError> {
        let mut ids: Vec<_> = self.read_instances()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn status(&self, id: InstanceId) -> Result<InstanceStatus, RenderError> {
        let state = self.state(id)?;
        let guard = Self::lock_state(&state)?;
        Ok(guard.status.clone())
    }

    pub fn metadata(&self, id: InstanceId) -> Result<Option<AudioMetadata>, RenderError> {
        let state = self.state(id)?;
        let guard = Self::lock_state(&state)?;
        Ok(guard.metadata.clone())
    }

    // ========================================================================
    // LAYOUT AND VIEW
    // ========================================================================

    /// Record the plot rectangle; schedules a full pass when drawable
    #[allow(clippy::too_many_arguments)]
    pub fn layout(
        &self,
        id: InstanceId,
        plot_x: u32,
        plot_y: u32,
        plot_width: u32,
        plot_height: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Result<(), RenderError> {
        self.apply_geometry(
            id,
            Geometry::new(
                plot_x,
                plot_y,
                plot_width,
                plot_height,
                canvas_width,
                canvas_height,
            ),
        )
    }

    /// `layout` from a container size in CSS pixels and a device pixel ratio
    pub fn layout_container(
        &self,
        id: InstanceId,
        css_width: f64,
        css_height: f64,
        dpr: f64,
    ) -> Result<Geometry, RenderError> {
        let geometry = Geometry::from_container(css_width, css_height, dpr, &self.config.layout);
        self.apply_geometry(id, geometry)?;
        Ok(geometry)
    }

    fn apply_geometry(&self, id: InstanceId, geometry: Geometry) -> Result<(), RenderError> {
        let state = self.state(id)?;
        Self::lock_state(&state)?.geometry = geometry;
        self.coordinator.set_geometry(id, geometry)?;

        if geometry.is_degenerate() {
            log::debug!(
                "[SpectrogramEngine] {} degenerate layout {}x{}, waiting for next layout",
                id,
                geometry.plot_width,
                geometry.plot_height
            );
            return Ok(());
        }
        self.schedule(id, false)?;
        Ok(())
    }

    pub fn view_state(&self, id: InstanceId) -> Result<ViewState, RenderError> {
        let state = self.state(id)?;
        let guard = Self::lock_state(&state)?;
        Ok(ViewState {
            zoom: guard.view.zoom(),
            pan: guard.view.pan(),
            dragging: guard.view.is_dragging(),
        })
    }

    fn with_view<R>(
        &self,
        id: InstanceId,
        f: impl FnOnce(&mut ViewController) -> R,
    ) -> Result<R, RenderError> {
        let state = self.state(id)?;
        let mut guard = Self::lock_state(&state)?;
        Ok(f(&mut guard.view))
    }

    pub fn set_zoom(&self, id: InstanceId, factor: f64) -> Result<(), RenderError> {
        if self.with_view(id, |view| view.set_zoom(factor))? {
            self.schedule(id, false)?;
        }
        Ok(())
    }

    /// Zoom by wheel notches using `view.wheel_zoom_factor`
    pub fn wheel_zoom(&self, id: InstanceId, notches: f64) -> Result<(), RenderError> {
        if self.with_view(id, |view| view.wheel(notches))? {
            self.schedule(id, false)?;
        }
        Ok(())
    }

    pub fn reset_zoom(&self, id: InstanceId) -> Result<(), RenderError> {
        self.with_view(id, |view| view.reset_zoom())?;
        self.schedule(id, false)?;
        Ok(())
    }

    pub fn set_pan(&self, id: InstanceId, fraction: f64) -> Result<(), RenderError> {
        self.with_view(id, |view| view.set_pan(fraction))?;
        self.schedule(id, false)?;
        Ok(())
    }

    /// Switch every instance between linear and logarithmic frequency axes
    pub fn set_log_scale(&self, enabled: bool) -> Result<(), RenderError> {
        if self.log_scale.swap(enabled, Ordering::SeqCst) == enabled {
            return Ok(());
        }
        log::info!("[SpectrogramEngine] log scale {}", enabled);
        for id in self.instance_ids()? {
            self.schedule(id, false)?;
        }
        Ok(())
    }

    pub fn log_scale(&self) -> bool {
        self.log_scale.load(Ordering::SeqCst)
    }

    // ========================================================================
    // POINTER INPUT
    // ========================================================================

    pub fn pointer_down(&self, id: InstanceId, x: f64) -> Result<bool, RenderError> {
        let has_audio = self.coordinator.has_audio(id)?;
        self.with_view(id, |view| view.pointer_down(x, has_audio))
    }

    pub fn pointer_move(&self, id: InstanceId, x: f64) -> Result<(), RenderError> {
        let state = self.state(id)?;
        let change = {
            let mut guard = Self::lock_state(&state)?;
            let width = guard.geometry.plot_width as f64;
            guard.view.pointer_move(x, width)
        };
        self.apply_change(id, change)
    }

    pub fn pointer_up(&self, id: InstanceId) -> Result<(), RenderError> {
        let change = self.with_view(id, |view| view.pointer_up())?;
        self.apply_change(id, change)
    }

    pub fn pointer_cancel(&self, id: InstanceId) -> Result<(), RenderError> {
        let change = self.with_view(id, |view| view.pointer_cancel())?;
        self.apply_change(id, change)
    }

    fn apply_change(&self, id: InstanceId, change: ViewChange) -> Result<(), RenderError> {
        match change {
            ViewChange::None => Ok(()),
            ViewChange::Coarse => self.schedule(id, true).map(|_| ()),
            ViewChange::Full => self.schedule(id, false).map(|_| ()),
        }
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    fn snapshot(&self, id: InstanceId, coarse: bool) -> Result<RenderSnapshot, RenderError> {
        let state = self.state(id)?;
        let guard = Self::lock_state(&state)?;
        Ok(RenderSnapshot {
            geometry: guard.geometry,
            zoom: guard.view.zoom(),
            pan: guard.view.pan(),
            log_scale: self.log_scale(),
            coarse,
        })
    }

    /// Post a request if the instance can be drawn; returns whether one was posted
    fn schedule(&self, id: InstanceId, coarse: bool) -> Result<bool, RenderError> {
        let snapshot = self.snapshot(id, coarse)?;
        if snapshot.geometry.is_degenerate() || !self.coordinator.has_audio(id)? {
            return Ok(false);
        }
        self.coordinator.request_render(id, snapshot)?;
        Ok(true)
    }

    /// Ask for a pass with the current view
    ///
    /// # Errors
    /// `NoAudio` if nothing is loaded, `DegenerateLayout` if the plot has no area.
    pub fn request_render(&self, id: InstanceId, dragging: bool) -> Result<(), RenderError> {
        let snapshot = self.snapshot(id, dragging)?;
        if !self.coordinator.has_audio(id)? {
            return Err(RenderError::NoAudio { id: id.0 });
        }
        snapshot.geometry.ensure_drawable()?;
        self.coordinator.request_render(id, snapshot)
    }

    /// One synchronous drain on the caller's thread
    pub fn drain_now(&self) -> Result<DrainReport, RenderError> {
        self.coordinator.drain()
    }

    pub fn latest_frame(&self, id: InstanceId) -> Result<Option<RenderedFrame>, RenderError> {
        self.coordinator.latest_frame(id)
    }

    /// Start the background render worker (idempotent)
    pub fn start_worker(&self) -> Result<(), RenderError> {
        let mut worker = self.lock_worker()?;
        if worker.is_some() {
            return Ok(());
        }
        let interval = Duration::from_millis(self.config.render.frame_interval_ms);
        let spawned = RenderWorker::spawn(Arc::clone(&self.coordinator), interval).map_err(|err| {
            RenderError::WorkerSpawn {
                details: err.to_string(),
            }
        })?;
        *worker = Some(spawned);
        telemetry::hub().record_lifecycle(LifecyclePhase::WorkerStarted);
        Ok(())
    }

    pub fn stop_worker(&self) -> Result<(), RenderError> {
        if let Some(mut worker) = self.lock_worker()?.take() {
            worker.shutdown();
            telemetry::hub().record_lifecycle(LifecyclePhase::WorkerStopped);
        }
        Ok(())
    }

    pub fn worker_running(&self) -> bool {
        self.lock_worker()
            .map(|worker| worker.as_ref().map(RenderWorker::is_running).unwrap_or(false))
            .unwrap_or(false)
    }

    /// PNG of the published frames of `ids`, tiled on a near-square grid
    ///
    /// Pending requests are drained first. Instances without audio or without
    /// a frame are left out; `Ok(None)` when nothing remains.
    pub fn export_composite(&self, ids: &[InstanceId]) -> Result<Option<Vec<u8>>, RenderError> {
        self.coordinator.drain()?;

        let mut frames = Vec::with_capacity(ids.len());
        for &id in ids {
            if !self.coordinator.has_audio(id)? {
                continue;
            }
            if let Some(frame) = self.coordinator.latest_frame(id)? {
                frames.push(frame.buffer);
            }
        }

        let buffers: Vec<_> = frames.iter().map(|buffer| buffer.as_ref()).collect();
        match composite_png(&buffers, self.config.render.export_max_dimension) {
            Ok(png) => Ok(Some(png)),
            Err(RenderError::ExportEmpty) => {
                log::info!("[SpectrogramEngine] nothing to export");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // AXES
    // ========================================================================

    /// Axis ticks for the current view; empty sets when no audio is loaded
    pub fn axis_ticks(&self, id: InstanceId, font_size: f64) -> Result<AxisTicks, RenderError> {
        let snapshot = self.snapshot(id, false)?;
        let geometry = snapshot.geometry;
        let db = db_ticks(geometry.plot_height, font_size);

        let Some(source) = self.coordinator.source(id)? else {
            return Ok(AxisTicks {
                frequency: Vec::new(),
                time: Vec::new(),
                db,
            });
        };

        Ok(AxisTicks {
            frequency: frequency_ticks(
                source.sample_rate(),
                snapshot.log_scale,
                geometry.plot_height,
                font_size,
            ),
            time: time_ticks(
                source.duration_secs(),
                snapshot.zoom,
                snapshot.pan,
                geometry.plot_width,
                font_size,
            ),
            db,
        })
    }
}

impl Drop for SpectrogramEngine {
    fn drop(&mut self) {
        let _ = self.stop_worker();
    }
}
