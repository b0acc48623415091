//! Replay series navigation and built-in scenarios.
//!
//! # Navigation
//!
//! ```ignore
//! use std::sync::Arc;
//! use pw_core::replay::{scenarios, ReplayStore};
//!
//! let mut store = ReplayStore::new();
//! store.load(Arc::new(scenarios::dixie_2021()))?;
//! store.seek_by_fraction(0.5);
//! let frame = store.active_frame();
//! ```
//!
//! # Built-in Scenarios
//!
//! ```ignore
//! use pw_core::replay::scenarios;
//!
//! let series = scenarios::dixie_2021();
//! let quiet = scenarios::calm_week();
//! ```

pub mod scenarios;
pub mod store;

pub use scenarios::{by_name, calm_week, dixie_2021, first_alert_frame, uniform_series, SeriesBuilder};
pub use store::{IndexChange, ReplayStore};
