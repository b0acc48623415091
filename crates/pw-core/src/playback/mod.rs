//! Playback clock and its tick schedule.

pub mod clock;
pub mod task;

pub use clock::{Epoch, PlaybackClock, PlaybackState};
pub use task::{ScheduledTask, TickControl};
