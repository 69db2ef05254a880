use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::render::FrameReady;
use crate::telemetry::{self, MetricEvent, TelemetrySnapshot};

use super::SpectrogramEngine;

impl SpectrogramEngine {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    pub fn subscribe_frames(&self) -> broadcast::Receiver<FrameReady> {
        self.coordinator.subscribe()
    }

    /// One item per published frame, across all instances
    pub fn frame_stream(&self) -> impl Stream<Item = FrameReady> + Unpin {
        self.coordinator.frame_stream()
    }

    pub fn telemetry_stream(&self) -> impl Stream<Item = MetricEvent> + Unpin {
        BroadcastStream::new(telemetry::hub().subscribe()).filter_map(|item| item.ok())
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        telemetry::hub().snapshot()
    }
}
