//! RenderWorker: periodic drain of the render mailbox.
//!
//! Runs on a dedicated thread with its own current-thread Tokio runtime so
//! callers do not need one. Each interval tick drains the coordinator once;
//! missed ticks are skipped rather than replayed.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::error::log_render_error;

use super::coordinator::RenderCoordinator;

pub struct RenderWorker {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Start draining `coordinator` every `interval`
    pub fn spawn(coordinator: Arc<RenderCoordinator>, interval: Duration) -> std::io::Result<Self> {
        let interval = interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("spek-render".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(err) => {
                        log::error!("[RenderWorker] Failed to create Tokio runtime: {}", err);
                        return;
                    }
                };

                rt.block_on(async move {
                    let mut ticker = tokio::time::interval(interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                    loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            _ = ticker.tick() => {
                                if let Err(err) = coordinator.drain() {
                                    log_render_error(&err, "render worker");
                                }
                            }
                        }
                    }
                });
                log::debug!("[RenderWorker] stopped");
            })?;

        log::info!(
            "[RenderWorker] started, interval {} ms",
            interval.as_millis()
        );

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the drain loop and join the thread; idempotent
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("[RenderWorker] render thread panicked");
            }
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synthetic;
    use crate::render::snapshot::{Geometry, InstanceId, RenderSnapshot};

    #[test]
    fn test_worker_drains_pending_requests() {
        let coordinator = Arc::new(RenderCoordinator::new(4));
        let id = InstanceId(1);
        let geometry = Geometry::new(0, 0, 8, 8, 8, 8);
        coordinator.register(id).unwrap();
        coordinator
            .attach_audio(id, Arc::new(synthetic::silence(0.2, 8_000).unwrap()))
            .unwrap();
        coordinator.set_geometry(id, geometry).unwrap();
        let mut rx = coordinator.subscribe();

        let mut worker =
            RenderWorker::spawn(Arc::clone(&coordinator), Duration::from_millis(5)).unwrap();
        assert!(worker.is_running());
        coordinator
            .request_render(id, RenderSnapshot::full_view(geometry))
            .unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = rt.enter();
        let frame = rt
            .block_on(tokio::time::timeout(Duration::from_secs(5), rx.recv()))
            .expect("worker never drained")
            .unwrap();
        assert_eq!(frame.instance, id);

        worker.shutdown();
        assert!(!worker.is_running());
        worker.shutdown();
    }
}
