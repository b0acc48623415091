//! Series identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a replay series (e.g. `dixie_2021`).
///
/// Loaders resolve a series by this id; the engine only uses it for
/// logging and event payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        SeriesId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be used as a file stem.
    ///
    /// Only ASCII alphanumerics, `-` and `_` are accepted so that an id can
    /// never escape a loader's base directory.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(id: &str) -> Self {
        SeriesId(id.to_string())
    }
}

impl From<String> for SeriesId {
    fn from(id: String) -> Self {
        SeriesId(id)
    }
}
