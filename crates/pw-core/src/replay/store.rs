//! Replay store: the active series and the current frame pointer.
//!
//! The store never wraps and never errors on navigation. Every target is
//! clamped into `[0, len - 1]`, and with no series loaded every navigation
//! call is a no-op that returns `None`.

use std::sync::Arc;

use pw_common::{Frame, ReplaySeries, Result};
use tracing::debug;

/// An index transition produced by a navigation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexChange {
    pub from: usize,
    pub to: usize,
}

impl IndexChange {
    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

/// Owns the active series and the current index.
#[derive(Debug, Default)]
pub struct ReplayStore {
    series: Option<Arc<ReplaySeries>>,
    current_index: usize,
}

impl ReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active series and rewind to the first frame.
    ///
    /// On error the previous series and index are kept.
    pub fn load(&mut self, series: Arc<ReplaySeries>) -> Result<()> {
        series.validate()?;
        debug!(
            series = %series.id(),
            frames = series.len(),
            alert_frame = ?series.alert_frame_index(),
            "replay store loaded series"
        );
        self.series = Some(series);
        self.current_index = 0;
        Ok(())
    }

    /// Drop the active series.
    pub fn unload(&mut self) {
        self.series = None;
        self.current_index = 0;
    }

    pub fn series(&self) -> Option<&Arc<ReplaySeries>> {
        self.series.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.series.is_some()
    }

    /// Number of frames in the active series (0 when nothing is loaded).
    pub fn len(&self) -> usize {
        self.series.as_ref().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_index(&self) -> Option<usize> {
        self.series.as_ref().map(|_| self.current_index)
    }

    /// Frame at the current index, or `None` when no series is loaded.
    ///
    /// `None` means "no data yet"; callers must not substitute frame 0.
    pub fn active_frame(&self) -> Option<&Frame> {
        self.series
            .as_ref()
            .and_then(|s| s.frame(self.current_index))
    }

    /// Whether the pointer sits on the final frame.
    pub fn is_at_end(&self) -> bool {
        self.series
            .as_ref()
            .is_some_and(|s| self.current_index >= s.last_index())
    }

    /// Jump to `target`, clamped into bounds.
    pub fn seek(&mut self, target: i64) -> Option<IndexChange> {
        let last = self.last_index()?;
        let to = if target <= 0 {
            0
        } else {
            usize::try_from(target).map_or(last, |t| t.min(last))
        };
        self.set_index(to)
    }

    /// Jump to a possibly non-integer position.
    ///
    /// Rounds half away from zero; NaN goes to the first frame and infinities
    /// clamp to the nearest end.
    pub fn seek_position(&mut self, target: f64) -> Option<IndexChange> {
        let last = self.last_index()?;
        let rounded = target.round();
        let to = if rounded.is_nan() || rounded <= 0.0 {
            0
        } else if rounded >= last as f64 {
            last
        } else {
            rounded as usize
        };
        self.set_index(to)
    }

    /// Jump to `round(fraction * (len - 1))`. The fraction is clamped to [0, 1].
    pub fn seek_by_fraction(&mut self, fraction: f64) -> Option<IndexChange> {
        let last = self.last_index()?;
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.seek_position(fraction * last as f64)
    }

    /// Move one frame forward; no-op at the last frame.
    pub fn step_forward(&mut self) -> Option<IndexChange> {
        let last = self.last_index()?;
        self.set_index((self.current_index + 1).min(last))
    }

    /// Move one frame back; no-op at the first frame.
    pub fn step_backward(&mut self) -> Option<IndexChange> {
        self.last_index()?;
        self.set_index(self.current_index.saturating_sub(1))
    }

    /// Playback position in [0, 1] for a progress bar.
    pub fn progress(&self) -> Option<f64> {
        let last = self.last_index()?;
        Some(self.current_index as f64 / last.max(1) as f64)
    }

    /// Position of the alert frame in [0, 1], for the scrubber marker.
    pub fn alert_marker_fraction(&self) -> Option<f64> {
        let series = self.series.as_ref()?;
        let alert = series.alert_frame_index()?;
        Some(alert as f64 / series.last_index().max(1) as f64)
    }

    fn last_index(&self) -> Option<usize> {
        self.series.as_ref().map(|s| s.last_index())
    }

    fn set_index(&mut self, to: usize) -> Option<IndexChange> {
        let change = IndexChange {
            from: self.current_index,
            to,
        };
        self.current_index = to;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::scenarios::uniform_series;

    fn loaded(len: usize) -> ReplayStore {
        let mut store = ReplayStore::new();
        store.load(Arc::new(uniform_series(len, None).unwrap())).unwrap();
        store
    }

    #[test]
    fn test_empty_store_is_noop() {
        let mut store = ReplayStore::new();
        assert!(store.active_frame().is_none());
        assert!(store.current_index().is_none());
        assert!(store.seek(3).is_none());
        assert!(store.step_forward().is_none());
        assert!(store.step_backward().is_none());
        assert!(store.seek_by_fraction(0.5).is_none());
        assert!(store.progress().is_none());
        assert!(!store.is_at_end());
    }

    #[test]
    fn test_load_rewinds() {
        let mut store = loaded(5);
        store.seek(4);
        store.load(Arc::new(uniform_series(3, None).unwrap())).unwrap();
        assert_eq!(store.current_index(), Some(0));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_seek_clamps() {
        let mut store = loaded(5);
        assert_eq!(store.seek(-7).map(|c| c.to), Some(0));
        assert_eq!(store.seek(99).map(|c| c.to), Some(4));
        assert_eq!(store.seek(i64::MAX).map(|c| c.to), Some(4));
        assert_eq!(store.seek(2).map(|c| c.to), Some(2));
    }

    #[test]
    fn test_seek_is_idempotent() {
        let mut store = loaded(5);
        store.seek(2);
        let change = store.seek(2).unwrap();
        assert!(!change.moved());
        assert_eq!(store.current_index(), Some(2));
    }

    #[test]
    fn test_seek_position_non_integer() {
        let mut store = loaded(5);
        assert_eq!(store.seek_position(2.5).map(|c| c.to), Some(3));
        assert_eq!(store.seek_position(2.4).map(|c| c.to), Some(2));
        assert_eq!(store.seek_position(f64::NAN).map(|c| c.to), Some(0));
        assert_eq!(store.seek_position(f64::INFINITY).map(|c| c.to), Some(4));
        assert_eq!(store.seek_position(f64::NEG_INFINITY).map(|c| c.to), Some(0));
    }

    #[test]
    fn test_seek_by_fraction() {
        let mut store = loaded(48);
        assert_eq!(store.seek_by_fraction(0.5).map(|c| c.to), Some(24));
        assert_eq!(store.seek_by_fraction(1.0).map(|c| c.to), Some(47));
        assert_eq!(store.seek_by_fraction(1.7).map(|c| c.to), Some(47));
        assert_eq!(store.seek_by_fraction(-0.2).map(|c| c.to), Some(0));
    }

    #[test]
    fn test_steps_clamp_at_bounds() {
        let mut store = loaded(2);
        assert!(!store.step_backward().unwrap().moved());
        assert!(store.step_forward().unwrap().moved());
        assert!(store.is_at_end());
        assert!(!store.step_forward().unwrap().moved());
        assert_eq!(store.current_index(), Some(1));
    }

    #[test]
    fn test_single_frame_series() {
        let mut store = loaded(1);
        assert!(store.is_at_end());
        assert_eq!(store.seek_by_fraction(0.9).map(|c| c.to), Some(0));
        assert_eq!(store.progress(), Some(0.0));
    }

    #[test]
    fn test_alert_marker_fraction() {
        let mut store = ReplayStore::new();
        store.load(Arc::new(uniform_series(5, Some(3)).unwrap())).unwrap();
        assert_eq!(store.alert_marker_fraction(), Some(0.75));
    }
}
