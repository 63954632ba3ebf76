use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::error::StockcastError;

/// Risk bucket assigned to a cluster of stocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    Aggressive,
    Moderate,
    Conservative,
}

impl RiskLabel {
    pub fn all() -> [RiskLabel; 3] {
        [RiskLabel::Conservative, RiskLabel::Moderate, RiskLabel::Aggressive]
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLabel::Aggressive => write!(f, "Aggressive"),
            RiskLabel::Moderate => write!(f, "Moderate"),
            RiskLabel::Conservative => write!(f, "Conservative"),
        }
    }
}

impl FromStr for RiskLabel {
    type Err = StockcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aggressive" => Ok(RiskLabel::Aggressive),
            "moderate" => Ok(RiskLabel::Moderate),
            "conservative" => Ok(RiskLabel::Conservative),
            other => Err(StockcastError::InvalidRequest(format!(
                "unknown risk label '{}'",
                other
            ))),
        }
    }
}

/// Local paths of one ticker's artifacts.
///
/// Downloaded artifacts live in a scratch directory owned by the request
/// that fetched them; it is removed once every clone of these paths is dropped.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub series: PathBuf,
    scratch: Option<Arc<TempDir>>,
}

impl ArtifactPaths {
    /// Paths into a directory the caller does not own.
    pub fn in_dir(dir: &Path, model: &str, scaler: &str, series: &str) -> Self {
        Self {
            model: dir.join(model),
            scaler: dir.join(scaler),
            series: dir.join(series),
            scratch: None,
        }
    }

    /// Paths into `scratch`, which lives as long as the returned value.
    pub fn in_scratch(scratch: TempDir, model: &str, scaler: &str, series: &str) -> Self {
        let paths = Self::in_dir(scratch.path(), model, scaler, series);
        Self {
            scratch: Some(Arc::new(scratch)),
            ..paths
        }
    }
}
