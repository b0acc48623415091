//! Playback clock state.
//!
//! The clock owns the speed multiplier, the playing flag and the single
//! scheduled tick task. Every transition that invalidates the running
//! schedule (pause, speed change while playing, series replacement) bumps
//! the epoch, and a tick that wakes up with a stale epoch must do nothing.
//! Together with aborting the old task before a new one is attached, this
//! keeps at most one live tick source per engine.

use std::time::Duration;

use pw_common::{Error, Result};
use pw_config::PlaybackConfig;
use serde::Serialize;
use tracing::debug;

use super::task::ScheduledTask;

/// Monotonic schedule generation.
pub type Epoch = u64;

/// Snapshot of the clock for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub speed_multiplier: u32,
    pub interval_ms: u64,
}

#[derive(Debug)]
pub struct PlaybackClock {
    config: PlaybackConfig,
    speed: u32,
    playing: bool,
    epoch: Epoch,
    task: Option<ScheduledTask>,
}

impl PlaybackClock {
    pub fn new(config: PlaybackConfig) -> Self {
        let speed = config.default_speed;
        Self {
            config,
            speed,
            playing: false,
            epoch: 0,
            task: None,
        }
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Tick interval at the current speed.
    pub fn interval(&self) -> Duration {
        self.config.interval_for(self.speed)
    }

    /// Whether a tick scheduled under `epoch` may still act.
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.playing && self.epoch == epoch
    }

    /// Change the multiplier. Returns the previous value.
    ///
    /// Rejected values leave the clock untouched. The caller reschedules if
    /// the clock is playing.
    pub fn set_speed(&mut self, multiplier: u32) -> Result<u32> {
        if !self.config.is_allowed(multiplier) {
            return Err(Error::InvalidSpeed {
                requested: multiplier,
                allowed: self.config.allowed_speeds.clone(),
            });
        }
        let previous = self.speed;
        self.speed = multiplier;
        Ok(previous)
    }

    /// Start a new schedule generation.
    ///
    /// Cancels any attached task and marks the clock playing. The returned
    /// epoch must be captured by the task that is attached next.
    pub fn begin(&mut self) -> Epoch {
        self.cancel_task();
        self.epoch += 1;
        self.playing = true;
        debug!(epoch = self.epoch, speed = self.speed, "playback schedule started");
        self.epoch
    }

    /// Attach the task created for the current epoch.
    pub fn attach(&mut self, task: ScheduledTask) {
        self.cancel_task();
        self.task = Some(task);
    }

    /// Stop playing and cancel the schedule. Returns whether it was playing.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.playing;
        self.playing = false;
        self.epoch += 1;
        self.cancel_task();
        if was_playing {
            debug!(epoch = self.epoch, "playback schedule stopped");
        }
        was_playing
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
        }
    }
}
