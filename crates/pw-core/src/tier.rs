//! Alert tier classification.
//!
//! [`classify`] maps a raw tier label to its display category. Labels come
//! from upstream data and are not guaranteed to use the known vocabulary, so
//! anything unrecognised (including an empty label) degrades to
//! [`TierKey::None`] instead of failing.
//!
//! The score-based helpers derive labels from a raw risk score using the
//! configured thresholds; they are what the scenario builder uses to produce
//! frames and to locate a series' alert frame.

use std::fmt;

use pw_config::{AlertThresholds, RiskLevelThresholds};
use serde::{Deserialize, Serialize};

/// Severity bucket, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierKey {
    None,
    Watch,
    Warning,
    Emergency,
}

impl TierKey {
    pub const ALL: [TierKey; 4] = [
        TierKey::None,
        TierKey::Watch,
        TierKey::Warning,
        TierKey::Emergency,
    ];

    /// Parse a known tier label. Case and surrounding whitespace are ignored.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "none" => Some(TierKey::None),
            "watch" => Some(TierKey::Watch),
            "warning" => Some(TierKey::Warning),
            "emergency" => Some(TierKey::Emergency),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TierKey::None => "none",
            TierKey::Watch => "watch",
            TierKey::Warning => "warning",
            TierKey::Emergency => "emergency",
        }
    }

    /// Tiers that mark a series' alert frame.
    pub fn is_alerting(self) -> bool {
        matches!(self, TierKey::Warning | TierKey::Emergency)
    }

    pub fn display(self) -> TierDisplay {
        let (display_color, display_text) = match self {
            TierKey::Emergency => ("#ff391f", "CRITICAL"),
            TierKey::Warning => ("#fd7e14", "HIGH"),
            TierKey::Watch => ("#ffc107", "MODERATE"),
            TierKey::None => ("#4b5563", "CLEAR"),
        };
        TierDisplay {
            key: self,
            display_color,
            display_text,
        }
    }
}

impl fmt::Display for TierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display category for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierDisplay {
    pub key: TierKey,
    pub display_color: &'static str,
    pub display_text: &'static str,
}

/// Map a raw tier label to its display category.
pub fn classify(label: &str) -> TierDisplay {
    TierKey::parse(label).unwrap_or(TierKey::None).display()
}

/// Alert tier for a raw risk score.
pub fn tier_for_score(score: f64, thresholds: &AlertThresholds) -> TierKey {
    if score >= thresholds.emergency {
        TierKey::Emergency
    } else if score >= thresholds.warning {
        TierKey::Warning
    } else if score >= thresholds.watch {
        TierKey::Watch
    } else {
        TierKey::None
    }
}

/// Risk level bucket for a raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    /// NaN scores fall through every comparison and land in `Low`.
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.extreme {
            RiskLevel::Extreme
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.moderate {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(classify("emergency").display_text, "CRITICAL");
        assert_eq!(classify("warning").display_color, "#fd7e14");
        assert_eq!(classify("watch").key, TierKey::Watch);
        assert_eq!(classify("none").display_text, "CLEAR");
    }

    #[test]
    fn test_unknown_labels_degrade_to_none() {
        for label in ["", "red-flag", "EXTREME", "  ", "null"] {
            assert_eq!(classify(label).key, TierKey::None, "label {label:?}");
        }
    }

    #[test]
    fn test_labels_are_normalised() {
        assert_eq!(classify(" Emergency ").key, TierKey::Emergency);
        assert_eq!(classify("WATCH").key, TierKey::Watch);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(TierKey::Emergency > TierKey::Warning);
        assert!(TierKey::Watch > TierKey::None);
        assert!(TierKey::Warning.is_alerting());
        assert!(!TierKey::Watch.is_alerting());
    }

    #[test]
    fn test_tier_for_score_boundaries() {
        let t = AlertThresholds::default();
        assert_eq!(tier_for_score(0.39, &t), TierKey::None);
        assert_eq!(tier_for_score(0.40, &t), TierKey::Watch);
        assert_eq!(tier_for_score(0.60, &t), TierKey::Warning);
        assert_eq!(tier_for_score(0.75, &t), TierKey::Emergency);
        assert_eq!(tier_for_score(f64::NAN, &t), TierKey::None);
    }

    #[test]
    fn test_risk_level_from_score() {
        let t = RiskLevelThresholds::default();
        assert_eq!(RiskLevel::from_score(0.1, &t), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.35, &t), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(0.6, &t), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.95, &t), RiskLevel::Extreme);
        assert_eq!(RiskLevel::from_score(f64::NAN, &t), RiskLevel::Low);
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        let json = serde_json::to_string(&classify("warning")).unwrap();
        assert!(json.contains("\"key\":\"warning\""));
    }
}
