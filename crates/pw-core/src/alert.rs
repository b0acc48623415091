//! One-shot alert edge detection.
//!
//! # State Machine
//!
//! ```text
//!            index >= threshold / emit Fired
//!   ARMED ──────────────────────────────────▶ FIRED
//!     ▲                                         │
//!     └─────────────────────────────────────────┘
//!            index < threshold / emit Rearmed
//! ```
//!
//! The detector looks only at the index it is shown, never at how the index
//! got there, so a seek-bar jump and a playback tick produce the same edges.
//! Without a threshold it stays ARMED forever.

use serde::Serialize;

/// Latch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    Armed,
    Fired,
}

/// An edge produced by [`AlertEdgeDetector::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEdge {
    /// The index reached the threshold while armed.
    Fired { index: usize, threshold: usize },
    /// The index dropped below the threshold while fired.
    Rearmed { index: usize, threshold: usize },
}

#[derive(Debug, Clone)]
pub struct AlertEdgeDetector {
    threshold: Option<usize>,
    state: AlertState,
}

impl AlertEdgeDetector {
    pub fn new(threshold: Option<usize>) -> Self {
        Self {
            threshold,
            state: AlertState::Armed,
        }
    }

    /// Re-arm for a new series.
    pub fn reset(&mut self, threshold: Option<usize>) {
        self.threshold = threshold;
        self.state = AlertState::Armed;
    }

    pub fn threshold(&self) -> Option<usize> {
        self.threshold
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn has_fired(&self) -> bool {
        self.state == AlertState::Fired
    }

    /// Feed the current index; returns the edge crossed, if any.
    pub fn observe(&mut self, index: usize) -> Option<AlertEdge> {
        let threshold = self.threshold?;
        match self.state {
            AlertState::Armed if index >= threshold => {
                self.state = AlertState::Fired;
                Some(AlertEdge::Fired { index, threshold })
            }
            AlertState::Fired if index < threshold => {
                self.state = AlertState::Armed;
                Some(AlertEdge::Rearmed { index, threshold })
            }
            _ => None,
        }
    }
}

impl Default for AlertEdgeDetector {
    fn default() -> Self {
        Self::new(None)
    }
}
