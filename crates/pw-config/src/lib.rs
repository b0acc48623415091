//! PyroWatch engine configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the engine configuration (`engine.toml`)
//! - Config resolution (explicit path → env → user config dir → defaults)
//! - Semantic validation of playback speeds and tier thresholds

pub mod engine;
pub mod resolve;
pub mod validate;

pub use engine::{
    AlertConfig, AlertThresholds, EngineConfig, PlaybackConfig, ReportConfig,
    RiskLevelThresholds,
};
pub use resolve::{resolve_config, resolve_config_with, ConfigSource, ResolvedConfig, CONFIG_ENV_VAR};
pub use validate::ValidationError;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
