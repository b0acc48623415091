//! Sources of replay series.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pw_common::{Error, ReplaySeries, Result, SeriesId};
use tracing::debug;

use crate::replay::scenarios;

/// Resolves a series identifier to a validated series.
#[async_trait]
pub trait SeriesLoader: Send + Sync {
    async fn load_replay(&self, id: &SeriesId) -> Result<ReplaySeries>;
}

/// Reads `<root>/<id>.json` replay documents.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    root: PathBuf,
}

impl JsonFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a series id maps to, or `None` if the id could escape the root.
    pub fn path_for(&self, id: &SeriesId) -> Option<PathBuf> {
        id.is_path_safe()
            .then(|| self.root.join(format!("{}.json", id.as_str())))
    }
}

/// Parse a replay document from disk.
pub async fn read_series_file(path: &Path) -> Result<ReplaySeries> {
    let content = tokio::fs::read_to_string(path).await?;
    ReplaySeries::from_json(&content)
}

#[async_trait]
impl SeriesLoader for JsonFileLoader {
    async fn load_replay(&self, id: &SeriesId) -> Result<ReplaySeries> {
        let path = self.path_for(id).ok_or_else(|| Error::SeriesNotFound {
            series_id: id.to_string(),
        })?;
        debug!(series = %id, path = %path.display(), "reading replay document");
        match read_series_file(&path).await {
            Err(Error::Io(err)) if err.kind() == ErrorKind::NotFound => Err(Error::SeriesNotFound {
                series_id: id.to_string(),
            }),
            other => other,
        }
    }
}

/// Serves the built-in scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioLoader;

#[async_trait]
impl SeriesLoader for ScenarioLoader {
    async fn load_replay(&self, id: &SeriesId) -> Result<ReplaySeries> {
        scenarios::by_name(id.as_str()).ok_or_else(|| Error::SeriesNotFound {
            series_id: id.to_string(),
        })
    }
}
