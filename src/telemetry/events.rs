//! Metric event types published by the render pipeline and engine facade.

use serde::{Deserialize, Serialize};

/// Lifecycle stages reported by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    InstanceCreated,
    InstanceDestroyed,
    WorkerStarted,
    WorkerStopped,
}

/// Why a pending render request produced no published frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Plot width or height was zero when the request was taken
    DegenerateLayout,
    /// Instance has no decoded audio (still loading, or decode failed)
    NoAudio,
    /// Layout changed while the pass was running; buffer discarded
    StaleGeometry,
    /// A newer request was published first; buffer discarded
    Superseded,
    /// Instance destroyed between post and drain
    InstanceGone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    RenderCompleted {
        instance: u64,
        width: u32,
        height: u32,
        coarse: bool,
        elapsed_ms: f32,
    },
    RenderTiming {
        avg_ms: f32,
        max_ms: f32,
        sample_count: usize,
    },
    RequestCoalesced {
        instance: u64,
    },
    RenderSkipped {
        instance: u64,
        reason: SkipReason,
    },
    DecodeFailed {
        instance: u64,
        code: i32,
        message: String,
    },
    Lifecycle {
        phase: LifecyclePhase,
        /// Milliseconds since the hub was created
        uptime_ms: u64,
    },
}
