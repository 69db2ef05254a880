//! Render telemetry: one process-wide hub fed by the coordinator and engine.
//!
//! Every event goes to a broadcast channel for live subscribers and into a
//! short ring of recent events that the CLI prints on request.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub mod events;

pub use events::{LifecyclePhase, MetricEvent, SkipReason};

static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

pub fn hub() -> &'static TelemetryHub {
    &HUB
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    /// Events pushed out of the ring by newer ones
    pub dropped_events: u64,
}

#[derive(Default)]
struct Ring {
    events: VecDeque<MetricEvent>,
    total: u64,
    dropped: u64,
}

/// Pass durations over the last `window` renders
struct PassTimes {
    window: usize,
    samples: VecDeque<f32>,
}

impl PassTimes {
    fn push(&mut self, elapsed_ms: f32) -> MetricEvent {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(elapsed_ms.max(0.0));

        let count = self.samples.len();
        let max_ms = self.samples.iter().copied().fold(0.0_f32, f32::max);
        let avg_ms = self.samples.iter().sum::<f32>() / count as f32;
        MetricEvent::RenderTiming {
            avg_ms,
            max_ms,
            sample_count: count,
        }
    }
}

pub struct TelemetryHub {
    tx: broadcast::Sender<MetricEvent>,
    ring: Mutex<Ring>,
    ring_capacity: usize,
    pass_times: Mutex<PassTimes>,
    started: Instant,
}

// A panicking publisher must not silence telemetry for everyone else.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, ring_capacity: usize, timing_window: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            tx,
            ring: Mutex::new(Ring::default()),
            ring_capacity,
            pass_times: Mutex::new(PassTimes {
                window: timing_window.max(1),
                samples: VecDeque::new(),
            }),
            started: Instant::now(),
        }
    }

    fn publish(&self, event: MetricEvent) {
        {
            let mut ring = lock(&self.ring);
            ring.total += 1;
            if self.ring_capacity > 0 {
                if ring.events.len() == self.ring_capacity {
                    ring.events.pop_front();
                    ring.dropped += 1;
                }
                ring.events.push_back(event.clone());
            }
        }
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let ring = lock(&self.ring);
        TelemetrySnapshot {
            recent: ring.events.iter().cloned().collect(),
            total_events: ring.total,
            dropped_events: ring.dropped,
        }
    }

    /// A published pass, followed by the updated rolling timing
    pub fn record_render(&self, instance: u64, width: u32, height: u32, coarse: bool, elapsed_ms: f32) {
        self.publish(MetricEvent::RenderCompleted {
            instance,
            width,
            height,
            coarse,
            elapsed_ms,
        });
        let timing = lock(&self.pass_times).push(elapsed_ms);
        self.publish(timing);
    }

    pub fn record_coalesced(&self, instance: u64) {
        self.publish(MetricEvent::RequestCoalesced { instance });
    }

    pub fn record_skip(&self, instance: u64, reason: SkipReason) {
        self.publish(MetricEvent::RenderSkipped { instance, reason });
    }

    pub fn record_decode_failure(&self, instance: u64, code: i32, message: impl Into<String>) {
        self.publish(MetricEvent::DecodeFailed {
            instance,
            code,
            message: message.into(),
        });
    }

    pub fn record_lifecycle(&self, phase: LifecyclePhase) {
        self.publish(MetricEvent::Lifecycle {
            phase,
            uptime_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 128, 32)
    }
}
