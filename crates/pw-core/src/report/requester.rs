//! Situation report requests.
//!
//! The enrichment service is reached through [`ReportRequester`]; the engine
//! never talks to a transport directly. [`TemplateReportRequester`] is the
//! offline implementation: it renders the same fixed-form report the upstream
//! service falls back to when its model is unreachable.

use async_trait::async_trait;
use pw_common::Frame;
use pw_config::ReportConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tier::TierKey;

/// Errors from an enrichment request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichmentError {
    #[error("enrichment service unreachable: {0}")]
    Transport(String),
}

/// Request body for one frame, combining its risk attributes with the fixed
/// weather context from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRiskAttributes {
    pub region: String,
    pub county: String,
    pub risk_score: f64,
    pub risk_level: String,
    pub alert_tier: String,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub fire_pixels: u64,
    pub forecast_hours: u32,
}

impl FrameRiskAttributes {
    pub fn from_frame(frame: &Frame, context: &ReportConfig) -> Self {
        Self {
            region: context.region.clone(),
            county: context.county.clone(),
            risk_score: frame.risk_score,
            risk_level: frame.risk_level.clone(),
            alert_tier: frame.alert_tier.clone(),
            wind_speed: context.wind_speed,
            wind_direction: context.wind_direction,
            temperature: context.temperature,
            humidity: context.humidity,
            fire_pixels: frame.fire_pixel_count,
            forecast_hours: context.forecast_hours,
        }
    }
}

/// Response from the enrichment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationReport {
    pub report: String,
    pub alert_tier: String,
}

#[async_trait]
pub trait ReportRequester: Send + Sync {
    async fn request_situation_report(
        &self,
        attributes: &FrameRiskAttributes,
    ) -> Result<SituationReport, EnrichmentError>;
}

/// Renders a fixed-form report from the attributes alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateReportRequester;

impl TemplateReportRequester {
    fn action_for(tier: TierKey) -> &'static str {
        match tier {
            TierKey::Emergency => "EVACUATE NOW: all zones in the affected area, no exceptions.",
            TierKey::Warning => {
                "Prepare for immediate evacuation. Pre-position resources at staging areas."
            }
            TierKey::Watch => "Monitor conditions closely. Notify residents to prepare go-bags.",
            TierKey::None => "Continue standard monitoring. No immediate action required.",
        }
    }

    pub fn render(attributes: &FrameRiskAttributes) -> String {
        let tier = TierKey::parse(&attributes.alert_tier).unwrap_or(TierKey::None);
        format!(
            "PyroWatch detects {} active fire hotspots in {} with a risk score of {:.2}/1.00, \
             triggering a {} alert. Primary risk drivers are wind speed of {:.1} m/s and \
             relative humidity of {:.1}%, creating extreme fire spread conditions across the \
             region. {}",
            attributes.fire_pixels,
            attributes.county,
            attributes.risk_score,
            tier.as_str().to_ascii_uppercase(),
            attributes.wind_speed,
            attributes.humidity,
            Self::action_for(tier),
        )
    }
}

#[async_trait]
impl ReportRequester for TemplateReportRequester {
    async fn request_situation_report(
        &self,
        attributes: &FrameRiskAttributes,
    ) -> Result<SituationReport, EnrichmentError> {
        Ok(SituationReport {
            report: Self::render(attributes),
            alert_tier: attributes.alert_tier.clone(),
        })
    }
}
