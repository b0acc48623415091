//! Replay frames.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One time-stamped snapshot of risk data in a replay series.
///
/// Field names on the wire follow the replay document produced upstream
/// (`frame`, `fire_pixels`, `geojson`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in the series (0-based).
    #[serde(rename = "frame")]
    pub index: usize,

    /// Display time marker, usually ISO-8601.
    pub timestamp: String,

    /// Relative label shown on the scrubber (e.g. `Hour +12`).
    #[serde(default)]
    pub hour_label: String,

    /// Risk score, higher is more severe. Observed range is [0, 1].
    pub risk_score: f64,

    /// Free-form risk level label (`low`, `moderate`, `high`, `extreme`).
    #[serde(default)]
    pub risk_level: String,

    /// Free-form alert tier label (`none`, `watch`, `warning`, `emergency`).
    #[serde(default)]
    pub alert_tier: String,

    /// Active fire pixels detected in this frame.
    #[serde(rename = "fire_pixels", default)]
    pub fire_pixel_count: u64,

    /// Opaque geometry payload for map rendering. Never inspected.
    #[serde(rename = "geojson", default)]
    pub spatial_overlay: serde_json::Value,

    /// Upstream per-frame summary, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<FrameSummary>,
}

/// Per-frame summary as produced upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub max_risk: f64,
    pub fire_pixels: u64,
    pub alert: String,
}

impl Frame {
    /// Parse the frame timestamp.
    ///
    /// Accepts RFC 3339 (normalised to UTC) and naive ISO-8601 date-times,
    /// which is what the upstream pipeline emits. Returns `None` for anything
    /// else.
    pub fn parsed_time(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}
