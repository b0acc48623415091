//! Built-in replay scenarios and the series builder behind them.
//!
//! Each scenario function returns a `ReplaySeries` derived from a raw score
//! curve the same way the upstream pipeline derives its replay documents:
//! risk level and alert tier are computed from the score with the configured
//! thresholds, and the alert frame is the first frame whose tier is
//! `warning` or `emergency`. These are designed for:
//!
//! - Demonstrations without the upstream model
//! - Regression tests with known alert positions
//! - Templates for hand-written replay documents

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pw_common::{Frame, FrameSummary, ReplaySeries, Result, SeriesId, SeriesMeta};
use pw_config::{AlertThresholds, RiskLevelThresholds};
use serde_json::json;

use crate::tier::{classify, tier_for_score, RiskLevel};

/// Names accepted by [`by_name`].
pub const SCENARIO_NAMES: [&str; 2] = ["dixie_2021", "calm_week"];

/// Index of the first frame whose alert tier is `warning` or `emergency`.
pub fn first_alert_frame(frames: &[Frame]) -> Option<usize> {
    frames
        .iter()
        .position(|f| classify(&f.alert_tier).key.is_alerting())
}

/// Builds a series from a sequence of risk scores.
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    id: SeriesId,
    name: String,
    start: NaiveDateTime,
    step: Duration,
    tiers: AlertThresholds,
    levels: RiskLevelThresholds,
    meta: Option<SeriesMeta>,
    alert_override: Option<Option<usize>>,
    frames: Vec<Frame>,
}

impl SeriesBuilder {
    pub fn new(id: impl Into<SeriesId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start: NaiveDate::from_ymd_opt(2021, 7, 13)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            step: Duration::hours(1),
            tiers: AlertThresholds::default(),
            levels: RiskLevelThresholds::default(),
            meta: None,
            alert_override: None,
            frames: Vec::new(),
        }
    }

    pub fn starting_at(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn thresholds(mut self, tiers: &AlertThresholds, levels: &RiskLevelThresholds) -> Self {
        self.tiers = tiers.clone();
        self.levels = levels.clone();
        self
    }

    pub fn meta(mut self, meta: SeriesMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Use this alert frame instead of deriving one from the tiers.
    pub fn alert_at(mut self, alert: Option<usize>) -> Self {
        self.alert_override = Some(alert);
        self
    }

    /// Append one frame with the given score and fire pixel count.
    pub fn frame(mut self, risk_score: f64, fire_pixels: u64) -> Self {
        let index = self.frames.len();
        let at = self.start + self.step * index as i32;
        let tier = tier_for_score(risk_score, &self.tiers);
        let level = RiskLevel::from_score(risk_score, &self.levels);
        let (lat, lon) = self
            .meta
            .as_ref()
            .map_or((0.0, 0.0), |m| (m.center_lat, m.center_lon));

        self.frames.push(Frame {
            index,
            timestamp: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            hour_label: format!("Hour +{index}"),
            risk_score,
            risk_level: level.to_string(),
            alert_tier: tier.to_string(),
            fire_pixel_count: fire_pixels,
            spatial_overlay: json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [lon, lat]},
                    "properties": {"risk_score": risk_score, "fire_pixels": fire_pixels},
                }],
            }),
            summary: Some(FrameSummary {
                max_risk: risk_score,
                fire_pixels,
                alert: tier.to_string(),
            }),
        });
        self
    }

    /// Append one frame per `(score, fire_pixels)` pair.
    pub fn frames(self, points: impl IntoIterator<Item = (f64, u64)>) -> Self {
        points
            .into_iter()
            .fold(self, |builder, (score, px)| builder.frame(score, px))
    }

    pub fn build(self) -> Result<ReplaySeries> {
        let alert = self
            .alert_override
            .unwrap_or_else(|| first_alert_frame(&self.frames));
        let series = ReplaySeries::new(self.id, self.name, self.frames, alert)?;
        Ok(match self.meta {
            Some(meta) => series.with_meta(meta),
            None => series,
        })
    }
}

fn dixie_meta() -> SeriesMeta {
    SeriesMeta {
        center_lat: 40.0,
        center_lon: -121.2,
        bbox: [
            ("min_lat".to_string(), 39.5),
            ("max_lat".to_string(), 40.6),
            ("min_lon".to_string(), -121.8),
            ("max_lon".to_string(), -120.5),
        ]
        .into_iter()
        .collect(),
        start_date: "2021-07-13".to_string(),
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Dixie Fire, Plumas County, July 2021: 48 hourly frames with a logistic
/// risk ramp that crosses into `warning` a little before the midpoint.
pub fn dixie_2021() -> ReplaySeries {
    let points = (0..48).map(|i| {
        let x = (i as f64 - 20.0) / 4.0;
        let score = round4(0.15 + 0.8 / (1.0 + (-x).exp()));
        let pixels = (2.0 + 180.0 * score * score).round() as u64;
        (score, pixels)
    });
    SeriesBuilder::new("dixie_2021", "Dixie Fire")
        .meta(dixie_meta())
        .frames(points)
        .build()
        .expect("built-in dixie_2021 scenario is valid")
}

/// A quiet week sampled every six hours; never leaves `none`/`watch`.
pub fn calm_week() -> ReplaySeries {
    let points = (0..28).map(|i| {
        let score = round4(0.2 + 0.15 * ((i as f64) / 4.0).sin().abs());
        (score, (score * 10.0) as u64)
    });
    let mut builder = SeriesBuilder::new("calm_week", "Calm Week");
    builder.step = Duration::hours(6);
    builder
        .frames(points)
        .build()
        .expect("built-in calm_week scenario is valid")
}

/// `len` flat low-risk frames with an explicit alert frame.
///
/// Handy for exercising navigation and edge detection without tier noise.
/// Fails with `InvalidSeries` when `len` is zero or `alert` is not below `len`.
pub fn uniform_series(len: usize, alert: Option<usize>) -> Result<ReplaySeries> {
    SeriesBuilder::new(format!("uniform_{len}"), "Uniform")
        .frames((0..len).map(|_| (0.1, 0)))
        .alert_at(alert)
        .build()
}

/// Look up a built-in scenario.
pub fn by_name(name: &str) -> Option<ReplaySeries> {
    match name {
        "dixie_2021" => Some(dixie_2021()),
        "calm_week" => Some(calm_week()),
        _ => None,
    }
}
