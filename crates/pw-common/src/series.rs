//! The immutable replay series.
//!
//! A [`ReplaySeries`] is created once per load and never mutated afterwards;
//! the engine shares it behind an `Arc` and replaces it wholesale when a new
//! series is loaded. Every constructor, including deserialization, runs the
//! same validation so a series that exists is always well formed:
//!
//! - at least one frame
//! - each frame's `index` equals its position
//! - frame times strictly increase (checked on frames whose timestamps parse)
//! - the alert frame index, if any, addresses an existing frame

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::id::SeriesId;
use crate::schema;

/// Geographic context of a replay series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    #[serde(default)]
    pub center_lat: f64,
    #[serde(default)]
    pub center_lon: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bbox: BTreeMap<String, f64>,
    #[serde(default)]
    pub start_date: String,
}

/// Ordered, validated sequence of frames plus the optional alert frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReplayDocument", into = "ReplayDocument")]
pub struct ReplaySeries {
    id: SeriesId,
    name: String,
    frames: Vec<Frame>,
    alert_frame_index: Option<usize>,
    meta: Option<SeriesMeta>,
}

impl ReplaySeries {
    /// Build and validate a series.
    pub fn new(
        id: impl Into<SeriesId>,
        name: impl Into<String>,
        frames: Vec<Frame>,
        alert_frame_index: Option<usize>,
    ) -> Result<Self> {
        let series = Self {
            id: id.into(),
            name: name.into(),
            frames,
            alert_frame_index,
            meta: None,
        };
        series.validate()?;
        Ok(series)
    }

    /// Attach geographic metadata.
    pub fn with_meta(mut self, meta: SeriesMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Check the series invariants.
    pub fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::InvalidSeries("series has no frames".to_string()));
        }

        if let Some(alert) = self.alert_frame_index {
            if alert >= self.frames.len() {
                return Err(Error::InvalidSeries(format!(
                    "alert frame {alert} out of range (series has {} frames)",
                    self.frames.len()
                )));
            }
        }

        for (position, frame) in self.frames.iter().enumerate() {
            if frame.index != position {
                return Err(Error::InvalidSeries(format!(
                    "frame at position {position} carries index {}",
                    frame.index
                )));
            }
        }

        let mut previous = None;
        for frame in &self.frames {
            let Some(at) = frame.parsed_time() else {
                continue;
            };
            if let Some((prev_index, prev_at)) = previous {
                if at <= prev_at {
                    return Err(Error::InvalidSeries(format!(
                        "frame {} ({}) is not after frame {prev_index}",
                        frame.index, frame.timestamp
                    )));
                }
            }
            previous = Some((frame.index, at));
        }

        Ok(())
    }

    pub fn id(&self) -> &SeriesId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a validated series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the final frame.
    pub fn last_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn alert_frame_index(&self) -> Option<usize> {
        self.alert_frame_index
    }

    pub fn meta(&self) -> Option<&SeriesMeta> {
        self.meta.as_ref()
    }

    /// Parse a replay document.
    ///
    /// Unlike `serde_json::from_str::<ReplaySeries>`, validation failures keep
    /// their own error variant instead of being folded into a JSON error.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ReplayDocument = serde_json::from_str(json)?;
        Self::try_from(doc)
    }

    /// Serialize as a replay document.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Wire representation of a replay series.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReplayDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    #[serde(default)]
    fire_id: SeriesId,
    #[serde(default)]
    fire_name: String,
    #[serde(default)]
    total_frames: Option<usize>,
    #[serde(default)]
    alert_frame: Option<usize>,
    frames: Vec<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<SeriesMeta>,
}

impl TryFrom<ReplayDocument> for ReplaySeries {
    type Error = Error;

    fn try_from(doc: ReplayDocument) -> Result<Self> {
        if let Some(version) = &doc.schema_version {
            if !schema::is_compatible(version) {
                return Err(Error::IncompatibleSchema {
                    found: version.clone(),
                    expected: schema::SCHEMA_VERSION.to_string(),
                });
            }
        }
        if let Some(total) = doc.total_frames {
            if total != doc.frames.len() {
                return Err(Error::InvalidSeries(format!(
                    "total_frames is {total} but {} frames were supplied",
                    doc.frames.len()
                )));
            }
        }

        let series = ReplaySeries::new(doc.fire_id, doc.fire_name, doc.frames, doc.alert_frame)?;
        Ok(match doc.meta {
            Some(meta) => series.with_meta(meta),
            None => series,
        })
    }
}

impl From<ReplaySeries> for ReplayDocument {
    fn from(series: ReplaySeries) -> Self {
        ReplayDocument {
            schema_version: Some(schema::SCHEMA_VERSION.to_string()),
            fire_id: series.id,
            fire_name: series.name,
            total_frames: Some(series.frames.len()),
            alert_frame: series.alert_frame_index,
            frames: series.frames,
            meta: series.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(index: usize, hour: u32) -> Frame {
        Frame {
            index,
            timestamp: format!("2021-07-13T{hour:02}:00:00"),
            hour_label: format!("Hour +{index}"),
            risk_score: 0.1 * index as f64,
            risk_level: "low".to_string(),
            alert_tier: "none".to_string(),
            fire_pixel_count: 0,
            spatial_overlay: serde_json::Value::Null,
            summary: None,
        }
    }

    #[test]
    fn test_valid_series() {
        let series = ReplaySeries::new("s", "Test", vec![frame(0, 0), frame(1, 1)], Some(1)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_index(), 1);
        assert_eq!(series.alert_frame_index(), Some(1));
    }

    #[test]
    fn test_empty_series_rejected() {
        let err = ReplaySeries::new("s", "Test", vec![], None).unwrap_err();
        assert!(matches!(err, Error::InvalidSeries(_)));
    }

    #[test]
    fn test_alert_out_of_range_rejected() {
        let err = ReplaySeries::new("s", "Test", vec![frame(0, 0)], Some(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidSeries(_)));
    }

    #[test]
    fn test_index_mismatch_rejected() {
        let err = ReplaySeries::new("s", "Test", vec![frame(0, 0), frame(2, 1)], None).unwrap_err();
        assert!(err.to_string().contains("position 1"));
    }

    #[test]
    fn test_time_must_increase() {
        let err = ReplaySeries::new("s", "Test", vec![frame(0, 5), frame(1, 5)], None).unwrap_err();
        assert!(matches!(err, Error::InvalidSeries(_)));
    }

    #[test]
    fn test_unparseable_timestamps_skip_ordering_check() {
        let mut a = frame(0, 0);
        a.timestamp = "start".to_string();
        let b = frame(1, 1);
        assert!(ReplaySeries::new("s", "Test", vec![a, b], None).is_ok());
    }

    #[test]
    fn test_document_roundtrip_validates() {
        let doc = json!({
            "fire_id": "dixie_2021",
            "fire_name": "Dixie Fire",
            "total_frames": 2,
            "alert_frame": 1,
            "frames": [
                {"frame": 0, "timestamp": "2021-07-13T00:00:00", "risk_score": 0.2},
                {"frame": 1, "timestamp": "2021-07-13T01:00:00", "risk_score": 0.7}
            ],
            "meta": {"center_lat": 40.0, "center_lon": -121.2, "start_date": "2021-07-13"}
        });
        let series: ReplaySeries = serde_json::from_value(doc).unwrap();
        assert_eq!(series.id().as_str(), "dixie_2021");
        assert_eq!(series.meta().map(|m| m.center_lat), Some(40.0));

        let back = serde_json::to_value(&series).unwrap();
        assert_eq!(back["total_frames"], 2);
        assert_eq!(back["schema_version"], schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_document_total_frames_mismatch() {
        let doc = json!({
            "total_frames": 3,
            "frames": [{"frame": 0, "timestamp": "2021-07-13T00:00:00", "risk_score": 0.2}]
        });
        let err = serde_json::from_value::<ReplaySeries>(doc).unwrap_err();
        assert!(err.to_string().contains("total_frames"));
    }

    #[test]
    fn test_document_incompatible_schema() {
        let doc = json!({
            "schema_version": "2.0.0",
            "frames": [{"frame": 0, "timestamp": "2021-07-13T00:00:00", "risk_score": 0.2}]
        });
        let err = serde_json::from_value::<ReplaySeries>(doc).unwrap_err();
        assert!(err.to_string().contains("incompatible"));
    }

    #[test]
    fn test_document_empty_frames() {
        let doc = json!({"fire_id": "x", "frames": []});
        assert!(serde_json::from_value::<ReplaySeries>(doc).is_err());
    }

    #[test]
    fn test_from_json_keeps_error_variant() {
        let err = ReplaySeries::from_json(r#"{"fire_id": "x", "frames": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidSeries(_)));

        let err = ReplaySeries::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));

        let err = ReplaySeries::from_json(
            r#"{"schema_version": "9.0.0", "frames": [{"frame": 0, "timestamp": "t", "risk_score": 0.1}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::IncompatibleSchema { .. }));
    }
}
