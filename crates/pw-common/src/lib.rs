//! PyroWatch common types, IDs, and errors.
//!
//! This crate provides the data model shared by the engine crates:
//! - Replay frames and the immutable replay series that owns them
//! - Series identity
//! - The unified error type
//! - Replay document schema versioning

pub mod error;
pub mod frame;
pub mod id;
pub mod schema;
pub mod series;

pub use error::{Error, Result};
pub use frame::{Frame, FrameSummary};
pub use id::SeriesId;
pub use schema::SCHEMA_VERSION;
pub use series::{ReplaySeries, SeriesMeta};
