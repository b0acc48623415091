//! Semantic validation of engine configuration.

use std::time::Duration;

use thiserror::Error;

use crate::engine::{AlertThresholds, EngineConfig, PlaybackConfig, RiskLevelThresholds};

/// Errors from loading or validating configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid {field}: {reason}")]
    Semantic { field: &'static str, reason: String },
}

impl ValidationError {
    fn semantic(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Semantic {
            field,
            reason: reason.into(),
        }
    }
}

impl EngineConfig {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_playback(&self.playback)?;
        validate_tiers(&self.tiers)?;
        validate_risk_levels(&self.risk_levels)?;
        if self.report.forecast_hours == 0 {
            return Err(ValidationError::semantic(
                "report.forecast_hours",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn validate_playback(playback: &PlaybackConfig) -> Result<(), ValidationError> {
    if playback.base_interval_ms == 0 {
        return Err(ValidationError::semantic(
            "playback.base_interval_ms",
            "must be positive",
        ));
    }
    if playback.allowed_speeds.is_empty() {
        return Err(ValidationError::semantic(
            "playback.allowed_speeds",
            "must list at least one speed",
        ));
    }
    if playback.allowed_speeds.contains(&0) {
        return Err(ValidationError::semantic(
            "playback.allowed_speeds",
            "speeds must be positive",
        ));
    }
    if let Some(&speed) = playback
        .allowed_speeds
        .iter()
        .find(|&&speed| playback.interval_for(speed) < Duration::from_millis(1))
    {
        return Err(ValidationError::semantic(
            "playback.allowed_speeds",
            format!(
                "{speed}x gives a tick shorter than 1 ms at base_interval_ms = {}",
                playback.base_interval_ms
            ),
        ));
    }
    if !playback.is_allowed(playback.default_speed) {
        return Err(ValidationError::semantic(
            "playback.default_speed",
            format!(
                "{} is not one of {:?}",
                playback.default_speed, playback.allowed_speeds
            ),
        ));
    }
    Ok(())
}

fn validate_tiers(tiers: &AlertThresholds) -> Result<(), ValidationError> {
    check_ascending(
        "tiers",
        &[tiers.watch, tiers.warning, tiers.emergency],
    )
}

fn validate_risk_levels(levels: &RiskLevelThresholds) -> Result<(), ValidationError> {
    check_ascending(
        "risk_levels",
        &[levels.moderate, levels.high, levels.extreme],
    )
}

fn check_ascending(field: &'static str, values: &[f64]) -> Result<(), ValidationError> {
    if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(ValidationError::semantic(field, "thresholds must lie in [0, 1]"));
    }
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ValidationError::semantic(
            field,
            format!("thresholds must be strictly ascending, got {values:?}"),
        ));
    }
    Ok(())
}
