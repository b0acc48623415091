//! Cancellable periodic task.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shortest period a schedule runs at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Returned by a tick callback to keep or end the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// A spawned periodic task. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `on_tick` every `period`, first after one full period.
    ///
    /// Late ticks are delayed rather than bunched up, so a stalled runtime
    /// never produces a burst of catch-up advances. Periods below
    /// [`MIN_PERIOD`] are raised to it.
    pub fn spawn_periodic<F>(runtime: &Handle, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if on_tick() == TickControl::Stop {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the task. A tick that is already running completes, but no
    /// further tick starts.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let _task = ScheduledTask::spawn_periodic(&Handle::current(), Duration::from_millis(100), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_raised_to_minimum() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = ScheduledTask::spawn_periodic(&Handle::current(), Duration::ZERO, move || {
            seen.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        });

        tokio::time::sleep(Duration::from_micros(10_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert!(!task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_schedule() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = ScheduledTask::spawn_periodic(&Handle::current(), Duration::from_millis(10), move || {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let task = ScheduledTask::spawn_periodic(&Handle::current(), Duration::from_millis(10), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        });
        task.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
