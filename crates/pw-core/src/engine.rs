//! The replay engine.
//!
//! [`ReplayEngine`] composes the replay store, the playback clock, the alert
//! edge detector and the report cache behind one handle. All frame-pointer
//! mutations, whether from a user call or a playback tick, go through the
//! same lock, so the derived state (active frame, alert latch) is always
//! computed from one consistent index.
//!
//! # Lock order
//!
//! The engine lock may be held while taking the report table lock, never the
//! other way round. Report tasks only ever touch the report table.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pw_config::EngineConfig;
//! use pw_core::{replay::scenarios, ReplayEngine, TemplateReportRequester};
//!
//! let engine = ReplayEngine::new(EngineConfig::default(), Arc::new(TemplateReportRequester))?;
//! let mut events = engine.subscribe();
//! engine.load(scenarios::dixie_2021())?;
//! engine.set_speed(4)?;
//! engine.play();
//! ```

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use pw_common::{Error, Frame, ReplaySeries, Result, SeriesId};
use pw_config::EngineConfig;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::alert::{AlertEdge, AlertEdgeDetector, AlertState};
use crate::events::{ChangeCause, EngineEvent, EventBus, StopReason, DEFAULT_EVENT_CAPACITY};
use crate::loader::SeriesLoader;
use crate::playback::{Epoch, PlaybackClock, PlaybackState, ScheduledTask, TickControl};
use crate::replay::{IndexChange, ReplayStore};
use crate::report::{ReportCache, ReportRequester, ReportSnapshot, ReportTicket};

/// Result of [`ReplayEngine::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    AlreadyPlaying,
    /// The pointer is on the last frame; playback did not start.
    AtEnd,
    NoSeries,
}

/// Mutable engine state, guarded by one lock.
struct EngineState {
    store: ReplayStore,
    clock: PlaybackClock,
    alert: AlertEdgeDetector,
}

impl EngineState {
    /// Publish a frame change and feed the alert detector.
    ///
    /// Returns the new active frame when the index moved.
    fn apply_change(
        &mut self,
        change: Option<IndexChange>,
        cause: ChangeCause,
        events: &EventBus,
        pulse_ms: u64,
    ) -> Option<Frame> {
        let change = change.filter(IndexChange::moved)?;
        events.emit(EngineEvent::FrameChanged {
            from: change.from,
            to: change.to,
            cause,
        });
        self.observe_alert(change.to, events, pulse_ms);
        self.store.active_frame().cloned()
    }

    fn observe_alert(&mut self, index: usize, events: &EventBus, pulse_ms: u64) {
        match self.alert.observe(index) {
            Some(AlertEdge::Fired { index, threshold }) => {
                info!(index, threshold, "alert threshold reached");
                events.emit(EngineEvent::AlertFired {
                    index,
                    threshold,
                    pulse_ms,
                });
            }
            Some(AlertEdge::Rearmed { index, threshold }) => {
                debug!(index, threshold, "alert re-armed");
                events.emit(EngineEvent::AlertRearmed { index, threshold });
            }
            None => {}
        }
    }

    /// One playback tick under the schedule generation `epoch`.
    fn on_tick(
        &mut self,
        epoch: Epoch,
        events: &EventBus,
        pulse_ms: u64,
    ) -> (TickControl, Option<Frame>) {
        if !self.clock.is_current(epoch) {
            return (TickControl::Stop, None);
        }
        if self.store.is_at_end() {
            self.clock.stop();
            info!(index = ?self.store.current_index(), "playback reached end of series");
            events.emit(EngineEvent::PlaybackStopped {
                reason: StopReason::EndOfSeries,
                index: self.store.current_index(),
            });
            return (TickControl::Stop, None);
        }
        let change = self.store.step_forward();
        let frame = self.apply_change(change, ChangeCause::Tick, events, pulse_ms);
        (TickControl::Continue, frame)
    }

    fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            current_index: self.store.current_index(),
            is_playing: self.clock.is_playing(),
            speed_multiplier: self.clock.speed(),
            interval_ms: u64::try_from(self.clock.interval().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Replay playback engine.
pub struct ReplayEngine {
    shared: Arc<Mutex<EngineState>>,
    reports: ReportCache,
    events: EventBus,
    config: Arc<EngineConfig>,
    runtime: Handle,
}

impl ReplayEngine {
    /// Create an engine on the current tokio runtime.
    pub fn new(config: EngineConfig, requester: Arc<dyn ReportRequester>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::RuntimeUnavailable(e.to_string()))?;
        Self::with_runtime(config, requester, runtime)
    }

    /// Create an engine that schedules its tasks on `runtime`.
    pub fn with_runtime(
        config: EngineConfig,
        requester: Arc<dyn ReportRequester>,
        runtime: Handle,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        let events = EventBus::new(DEFAULT_EVENT_CAPACITY);
        let reports = ReportCache::new(
            requester,
            config.report.clone(),
            Some(events.clone()),
            runtime.clone(),
        );
        let state = EngineState {
            store: ReplayStore::new(),
            clock: PlaybackClock::new(config.playback.clone()),
            alert: AlertEdgeDetector::default(),
        };
        Ok(Self {
            shared: Arc::new(Mutex::new(state)),
            reports,
            events,
            config: Arc::new(config),
            runtime,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Series lifecycle
    // ------------------------------------------------------------------

    /// Replace the active series.
    ///
    /// Stops playback, rewinds to frame 0, re-arms the alert detector for the
    /// new alert frame and drops every cached report. An invalid series is
    /// rejected and the current state is kept.
    pub fn load(&self, series: ReplaySeries) -> Result<()> {
        let series = Arc::new(series);
        let pulse_ms = self.config.alert.pulse_ms;
        let pinned = {
            let mut state = self.lock();
            state.store.load(Arc::clone(&series))?;

            if state.clock.stop() {
                self.events.emit(EngineEvent::PlaybackStopped {
                    reason: StopReason::SeriesReplaced,
                    index: Some(0),
                });
            }
            state.alert.reset(series.alert_frame_index());
            self.reports.clear();

            info!(
                series = %series.id(),
                frames = series.len(),
                alert_frame = ?series.alert_frame_index(),
                "replay series loaded"
            );
            self.events.emit(EngineEvent::SeriesLoaded {
                series_id: series.id().clone(),
                frames: series.len(),
                alert_frame: series.alert_frame_index(),
            });
            state.observe_alert(0, &self.events, pulse_ms);
            self.pin(&state, state.store.active_frame().cloned())
        };
        self.auto_ensure(pinned);
        Ok(())
    }

    /// Load through `loader`. On failure the current series is kept.
    pub async fn load_from(&self, loader: &dyn SeriesLoader, id: &SeriesId) -> Result<()> {
        match loader.load_replay(id).await {
            Ok(series) => self.load(series),
            Err(err) => {
                warn!(series = %id, error = %err, "replay load failed; keeping current series");
                Err(err)
            }
        }
    }

    /// Load a replay document from JSON text.
    pub fn load_json(&self, json: &str) -> Result<()> {
        self.load(ReplaySeries::from_json(json)?)
    }

    /// Drop the active series and everything derived from it.
    pub fn unload(&self) {
        let mut state = self.lock();
        if state.clock.stop() {
            self.events.emit(EngineEvent::PlaybackStopped {
                reason: StopReason::SeriesReplaced,
                index: state.store.current_index(),
            });
        }
        state.store.unload();
        state.alert.reset(None);
        self.reports.clear();
        self.events.emit(EngineEvent::SeriesUnloaded);
    }

    pub fn series(&self) -> Option<Arc<ReplaySeries>> {
        self.lock().store.series().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().store.is_loaded()
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Jump to a frame index (clamped). Returns the new index.
    pub fn seek(&self, target: i64) -> Option<usize> {
        self.navigate(ChangeCause::Seek, |store| store.seek(target))
    }

    /// Jump to a possibly non-integer position (rounded, then clamped).
    pub fn seek_position(&self, target: f64) -> Option<usize> {
        self.navigate(ChangeCause::Seek, |store| store.seek_position(target))
    }

    /// Jump to a fraction of the series in [0, 1].
    pub fn seek_by_fraction(&self, fraction: f64) -> Option<usize> {
        self.navigate(ChangeCause::Seek, |store| store.seek_by_fraction(fraction))
    }

    pub fn step_forward(&self) -> Option<usize> {
        self.navigate(ChangeCause::Step, ReplayStore::step_forward)
    }

    pub fn step_backward(&self) -> Option<usize> {
        self.navigate(ChangeCause::Step, ReplayStore::step_backward)
    }

    fn navigate<F>(&self, cause: ChangeCause, op: F) -> Option<usize>
    where
        F: FnOnce(&mut ReplayStore) -> Option<IndexChange>,
    {
        let pulse_ms = self.config.alert.pulse_ms;
        let (index, pinned) = {
            let mut state = self.lock();
            let change = op(&mut state.store);
            let frame = state.apply_change(change, cause, &self.events, pulse_ms);
            (change.map(|c| c.to), self.pin(&state, frame))
        };
        self.auto_ensure(pinned);
        index
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Start advancing one frame per interval.
    ///
    /// On the last frame this does not start at all, so the play control
    /// never flickers on and off.
    pub fn play(&self) -> PlayOutcome {
        let mut state = self.lock();
        if !state.store.is_loaded() {
            return PlayOutcome::NoSeries;
        }
        if state.clock.is_playing() {
            return PlayOutcome::AlreadyPlaying;
        }
        if state.store.is_at_end() {
            debug!("play requested on the last frame; ignoring");
            return PlayOutcome::AtEnd;
        }
        self.start_schedule(&mut state);
        let snapshot = state.playback_state();
        info!(
            speed = snapshot.speed_multiplier,
            interval_ms = snapshot.interval_ms,
            "playback started"
        );
        self.events.emit(EngineEvent::PlaybackStarted {
            speed: snapshot.speed_multiplier,
            interval_ms: snapshot.interval_ms,
        });
        PlayOutcome::Started
    }

    /// Stop advancing. Returns whether playback was running.
    pub fn pause(&self) -> bool {
        let mut state = self.lock();
        let was_playing = state.clock.stop();
        if was_playing {
            info!(index = ?state.store.current_index(), "playback paused");
            self.events.emit(EngineEvent::PlaybackStopped {
                reason: StopReason::Paused,
                index: state.store.current_index(),
            });
        }
        was_playing
    }

    /// Pause if playing, otherwise play. Returns whether playback is now running.
    pub fn toggle(&self) -> bool {
        if self.pause() {
            return false;
        }
        self.play() == PlayOutcome::Started
    }

    /// Change the speed multiplier.
    ///
    /// While playing, the schedule is replaced so the new interval applies
    /// to the next tick. Disallowed values are rejected without any change.
    pub fn set_speed(&self, multiplier: u32) -> Result<()> {
        let mut state = self.lock();
        let previous = state.clock.set_speed(multiplier)?;
        if previous == multiplier {
            return Ok(());
        }
        if state.clock.is_playing() {
            self.start_schedule(&mut state);
        }
        debug!(from = previous, to = multiplier, "playback speed changed");
        self.events.emit(EngineEvent::SpeedChanged {
            from: previous,
            to: multiplier,
        });
        Ok(())
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.lock().playback_state()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().clock.is_playing()
    }

    fn start_schedule(&self, state: &mut EngineState) {
        let epoch = state.clock.begin();
        let period = state.clock.interval();
        let weak: Weak<Mutex<EngineState>> = Arc::downgrade(&self.shared);
        let events = self.events.clone();
        let reports = self.reports.clone();
        let auto_ensure = self.config.report.auto_ensure;
        let pulse_ms = self.config.alert.pulse_ms;

        let task = ScheduledTask::spawn_periodic(&self.runtime, period, move || {
            let Some(shared) = weak.upgrade() else {
                return TickControl::Stop;
            };
            let (control, pinned) = {
                let mut state = lock_state(&shared);
                let (control, frame) = state.on_tick(epoch, &events, pulse_ms);
                (control, frame.map(|frame| (reports.generation(), frame)))
            };
            if let Some((generation, frame)) = pinned.filter(|_| auto_ensure) {
                reports.ensure_in(generation, &frame);
            }
            control
        });
        state.clock.attach(task);
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    /// The frame at the current index, or `None` when nothing is loaded.
    pub fn active_frame(&self) -> Option<Frame> {
        self.lock().store.active_frame().cloned()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.lock().store.current_index()
    }

    pub fn progress(&self) -> Option<f64> {
        self.lock().store.progress()
    }

    pub fn alert_marker_fraction(&self) -> Option<f64> {
        self.lock().store.alert_marker_fraction()
    }

    pub fn alert_state(&self) -> AlertState {
        self.lock().alert.state()
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    /// Ensure a report for the active frame. `None` when nothing is loaded.
    pub fn ensure_active_report(&self) -> Option<ReportTicket> {
        let (generation, frame) = self.pin_with(|store| store.active_frame().cloned())?;
        Some(self.reports.ensure_in(generation, &frame))
    }

    /// Re-fetch the report for the active frame.
    pub fn refresh_active_report(&self) -> Option<ReportTicket> {
        let (generation, frame) = self.pin_with(|store| store.active_frame().cloned())?;
        Some(self.reports.refresh_in(generation, &frame))
    }

    /// Ensure a report for any frame of the active series.
    pub fn ensure_report(&self, index: usize) -> Option<ReportTicket> {
        let (generation, frame) =
            self.pin_with(|store| store.series()?.frame(index).cloned())?;
        Some(self.reports.ensure_in(generation, &frame))
    }

    pub fn report_snapshot(&self, index: usize) -> ReportSnapshot {
        self.reports.snapshot(index)
    }

    /// Report entry for the active frame.
    pub fn active_report(&self) -> Option<ReportSnapshot> {
        let index = self.current_index()?;
        Some(self.reports.snapshot(index))
    }

    /// Tag `frame` with the cache generation it was read under.
    ///
    /// Requires the engine guard: frame and generation must come from the
    /// same critical section, or a concurrent `load` could pair an old-series
    /// frame with the new generation.
    fn pin(&self, _state: &EngineState, frame: Option<Frame>) -> Option<(u64, Frame)> {
        frame.map(|frame| (self.reports.generation(), frame))
    }

    fn pin_with<F>(&self, pick: F) -> Option<(u64, Frame)>
    where
        F: FnOnce(&ReplayStore) -> Option<Frame>,
    {
        let state = self.lock();
        let frame = pick(&state.store);
        self.pin(&state, frame)
    }

    fn auto_ensure(&self, pinned: Option<(u64, Frame)>) {
        if !self.config.report.auto_ensure {
            return;
        }
        if let Some((generation, frame)) = pinned {
            self.reports.ensure_in(generation, &frame);
        }
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Stop playback and cancel the tick schedule.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if state.clock.stop() {
            self.events.emit(EngineEvent::PlaybackStopped {
                reason: StopReason::Shutdown,
                index: state.store.current_index(),
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.shared)
    }
}

impl Drop for ReplayEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_state(shared: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
