//! PyroWatch replay playback engine.
//!
//! Loads an immutable series of wildfire-risk frames, lets an operator
//! scrub through it or play it at a fixed set of speeds, detects when
//! playback reaches the series' alert frame, and caches one situation
//! report per frame.
//!
//! - [`replay`]: the series store and built-in scenarios
//! - [`playback`]: the clock and its cancellable tick schedule
//! - [`alert`]: one-shot alert edge detection
//! - [`report`]: the enrichment seam and per-frame report cache
//! - [`engine`]: the engine that ties them together
//! - [`tier`]: alert tier classification

pub mod alert;
pub mod cli;
pub mod engine;
pub mod events;
pub mod exit_codes;
pub mod loader;
pub mod logging;
pub mod playback;
pub mod replay;
pub mod report;
pub mod tier;

pub use alert::{AlertEdge, AlertEdgeDetector, AlertState};
pub use engine::{PlayOutcome, ReplayEngine};
pub use events::{ChangeCause, EngineEvent, EventBus, StopReason};
pub use exit_codes::ExitCode;
pub use loader::{JsonFileLoader, ScenarioLoader, SeriesLoader};
pub use playback::PlaybackState;
pub use replay::ReplayStore;
pub use report::{
    EnrichmentError, FrameRiskAttributes, ReportCache, ReportRequester, ReportSnapshot,
    ReportStatus, ReportTicket, SituationReport, TemplateReportRequester,
};
pub use tier::{classify, TierDisplay, TierKey};
