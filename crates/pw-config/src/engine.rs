//! Engine configuration types.
//!
//! Every section has serde defaults, so an empty file (or no file at all)
//! yields the stock dashboard behaviour: 800 ms base tick, speeds 1×/4×/12×
//! starting at 12×, and the upstream alert-tier thresholds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub playback: PlaybackConfig,
    pub tiers: AlertThresholds,
    pub risk_levels: RiskLevelThresholds,
    pub alert: AlertConfig,
    pub report: ReportConfig,
}

/// Playback clock settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Tick interval at 1× speed, in milliseconds.
    pub base_interval_ms: u64,

    /// The discrete speed multipliers an operator may select.
    pub allowed_speeds: Vec<u32>,

    /// Speed selected when the engine is created.
    pub default_speed: u32,
}

impl PlaybackConfig {
    /// Tick interval for a speed multiplier (`base / speed`).
    ///
    /// A zero multiplier is treated as 1×; validated configs never contain one.
    pub fn interval_for(&self, speed: u32) -> Duration {
        Duration::from_millis(self.base_interval_ms) / speed.max(1)
    }

    pub fn is_allowed(&self, speed: u32) -> bool {
        self.allowed_speeds.contains(&speed)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 800,
            allowed_speeds: vec![1, 4, 12],
            default_speed: 12,
        }
    }
}

/// Score thresholds at which each alert tier begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub watch: f64,
    pub warning: f64,
    pub emergency: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            watch: 0.40,
            warning: 0.60,
            emergency: 0.75,
        }
    }
}

/// Score thresholds at which each risk level begins (`low` below `moderate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLevelThresholds {
    pub moderate: f64,
    pub high: f64,
    pub extreme: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.35,
            high: 0.55,
            extreme: 0.70,
        }
    }
}

/// Alert notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// How long a presentation layer should show the alert pulse.
    pub pulse_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { pulse_ms: 400 }
    }
}

/// Situation report settings.
///
/// The weather fields are the fixed context the dashboard sends alongside a
/// frame's risk attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub region: String,
    pub county: String,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Wind direction in degrees.
    pub wind_direction: f64,
    /// Air temperature in °C.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    pub forecast_hours: u32,
    /// Request a report for every frame the engine lands on.
    pub auto_ensure: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            region: "CA".to_string(),
            county: "Plumas County".to_string(),
            wind_speed: 15.2,
            wind_direction: 45.0,
            temperature: 36.7,
            humidity: 12.0,
            forecast_hours: 6,
            auto_ensure: false,
        }
    }
}

impl EngineConfig {
    /// Load a config file, choosing the format by extension (`.toml` or `.json`).
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::parse_toml(&content),
            Some("json") => Self::parse_json(&content),
            other => Err(ValidationError::ParseError(format!(
                "unsupported config format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Parse a config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> Result<Self, ValidationError> {
        toml::from_str(toml_str)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// Parse a config from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }
}
