//! Config resolution: explicit path → env → user config dir → defaults.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::engine::EngineConfig;
use crate::validate::ValidationError;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "PYROWATCH_CONFIG";

/// File name looked up in the user config directory.
const USER_CONFIG_FILE: &str = "engine.toml";

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Env(PathBuf),
    UserDir(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "explicit ({})", p.display()),
            ConfigSource::Env(p) => write!(f, "{} ({})", CONFIG_ENV_VAR, p.display()),
            ConfigSource::UserDir(p) => write!(f, "user config ({})", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// A validated configuration and its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    pub source: ConfigSource,
}

/// Resolve the engine configuration from the process environment.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ResolvedConfig, ValidationError> {
    let user_dir = dirs::config_dir().map(|dir| dir.join("pyrowatch"));
    resolve_config_with(explicit, std::env::var_os(CONFIG_ENV_VAR), user_dir.as_deref())
}

/// Resolve with injected inputs.
///
/// An explicit or env-named file must exist; the user-dir file is optional.
pub fn resolve_config_with(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    user_dir: Option<&Path>,
) -> Result<ResolvedConfig, ValidationError> {
    let (config, source) = if let Some(path) = explicit {
        (EngineConfig::from_file(path)?, ConfigSource::Explicit(path.to_path_buf()))
    } else if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        (EngineConfig::from_file(&path)?, ConfigSource::Env(path))
    } else if let Some(path) = user_dir
        .map(|dir| dir.join(USER_CONFIG_FILE))
        .filter(|p| p.is_file())
    {
        (EngineConfig::from_file(&path)?, ConfigSource::UserDir(path))
    } else {
        debug!("no config file found, using defaults");
        (EngineConfig::default(), ConfigSource::Defaults)
    };

    config.validate()?;
    info!(source = %source, "engine configuration resolved");
    Ok(ResolvedConfig { config, source })
}
