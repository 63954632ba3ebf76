use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactConfig,
    pub forecast: ForecastConfig,
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Which artifact source serves model files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSourceKind {
    #[default]
    Local,
    ObjectStore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub source: ArtifactSourceKind,
    /// Local directory holding one sub-directory per ticker.
    pub root: PathBuf,
    /// Object store base URL, e.g. `https://storage.googleapis.com/<bucket>/stock_model`.
    pub base_url: String,
    /// Where object store downloads are written before loading.
    pub cache_dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    pub series_file: String,
    pub timeout_secs: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            source: ArtifactSourceKind::Local,
            root: PathBuf::from("stock_model"),
            base_url: String::new(),
            cache_dir: PathBuf::from("cache/stock_model"),
            model_file: "model.txt".into(),
            scaler_file: "scaler.json".into(),
            series_file: "data_saham.csv".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub window_size: usize,
    pub default_steps: usize,
    pub max_steps: usize,
    /// Refit the persisted scaler on the freshly loaded series for every request.
    pub refit_scaler: bool,
    /// Feed ONNX models a `[1, W, 1]` tensor instead of `[1, W]`.
    pub onnx_recurrent_input: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            default_steps: 1,
            max_steps: 365,
            refit_scaler: true,
            onnx_recurrent_input: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub n_clusters: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub provider_base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            provider_base_url: "https://query1.finance.yahoo.com".into(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.forecast.window_size == 0 {
            return Err(ConfigError::Invalid("forecast.window_size must be positive".into()));
        }
        if self.clustering.n_clusters == 0 {
            return Err(ConfigError::Invalid("clustering.n_clusters must be positive".into()));
        }
        if self.artifacts.source == ArtifactSourceKind::ObjectStore
            && self.artifacts.base_url.is_empty()
        {
            return Err(ConfigError::Invalid(
                "artifacts.base_url is required for the object_store source".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
