//! Engine notifications for presentation layers.
//!
//! The engine never renders anything. Frame changes, playback transitions,
//! alert edges and settled reports are published on a broadcast channel and
//! whatever draws the dashboard subscribes to it. A subscriber that falls
//! behind loses the oldest events (`RecvError::Lagged`); the engine is never
//! blocked by a slow subscriber.

use pw_common::SeriesId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::report::ReportStatus;

/// Default broadcast buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What moved the frame pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Seek,
    Step,
    Tick,
}

/// Why playback stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Paused,
    EndOfSeries,
    SeriesReplaced,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    SeriesLoaded {
        series_id: SeriesId,
        frames: usize,
        alert_frame: Option<usize>,
    },
    SeriesUnloaded,
    FrameChanged {
        from: usize,
        to: usize,
        cause: ChangeCause,
    },
    PlaybackStarted {
        speed: u32,
        interval_ms: u64,
    },
    PlaybackStopped {
        reason: StopReason,
        index: Option<usize>,
    },
    SpeedChanged {
        from: u32,
        to: u32,
    },
    /// One-shot alert; presentation layers show a pulse for `pulse_ms`.
    AlertFired {
        index: usize,
        threshold: usize,
        pulse_ms: u64,
    },
    AlertRearmed {
        index: usize,
        threshold: usize,
    },
    ReportSettled {
        frame_index: usize,
        status: ReportStatus,
    },
}

/// Cloneable publisher handle.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: EngineEvent) {
        trace!(?event, "engine event");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
