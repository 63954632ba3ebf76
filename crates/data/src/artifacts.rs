// Per-ticker model artifacts: trained model, persisted scaler, price CSV.
//
// Two interchangeable sources: a local directory tree keyed by ticker, and
// an object store whose files are downloaded into a local cache before they
// are loaded the same way.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use stockcast_config::{ArtifactConfig, ArtifactSourceKind};
use stockcast_core::error::{Result, StockcastError};
use stockcast_core::models::PriceSeries;
use stockcast_core::traits::{ArtifactSource, PriceModel};
use stockcast_core::types::ArtifactPaths;
use stockcast_ml::model::{load_model, ModelOptions};
use stockcast_ml::scaler::MinMaxScaler;

use crate::series::read_price_csv;

/// File names inside a ticker directory.
#[derive(Debug, Clone)]
pub struct ArtifactFiles {
    pub model: String,
    pub scaler: String,
    pub series: String,
}

impl ArtifactFiles {
    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self {
            model: config.model_file.clone(),
            scaler: config.scaler_file.clone(),
            series: config.series_file.clone(),
        }
    }

    fn resolve(&self, dir: &Path) -> ArtifactPaths {
        ArtifactPaths::in_dir(dir, &self.model, &self.scaler, &self.series)
    }

    fn names(&self) -> [&str; 3] {
        [self.model.as_str(), self.scaler.as_str(), self.series.as_str()]
    }
}

/// Reject anything that could escape the ticker directory.
fn check_ticker(ticker: &str) -> Result<()> {
    let valid = !ticker.is_empty()
        && ticker != "."
        && ticker != ".."
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_'));
    if valid {
        Ok(())
    } else {
        Err(StockcastError::InvalidRequest(format!("invalid ticker '{}'", ticker)))
    }
}

// ── Local filesystem ────────────────────────────────────────────────

pub struct LocalArtifactSource {
    root: PathBuf,
    files: ArtifactFiles,
}

impl LocalArtifactSource {
    pub fn new(root: impl Into<PathBuf>, files: ArtifactFiles) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }
}

#[async_trait]
impl ArtifactSource for LocalArtifactSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn locate(&self, ticker: &str) -> Result<ArtifactPaths> {
        check_ticker(ticker)?;
        let paths = self.files.resolve(&self.root.join(ticker));
        for path in [&paths.model, &paths.scaler, &paths.series] {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(StockcastError::ArtifactNotFound(format!(
                    "{} for {}",
                    path.display(),
                    ticker
                )));
            }
        }
        debug!("Located artifacts for {} under {}", ticker, self.root.display());
        Ok(paths)
    }
}

// ── Object store ────────────────────────────────────────────────────

/// Downloads `{base_url}/{TICKER}/{file}` into a fresh scratch directory
/// under `cache_dir`, one per `locate` call, so concurrent requests for the
/// same ticker never share files.
pub struct ObjectStoreArtifactSource {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
    files: ArtifactFiles,
}

impl ObjectStoreArtifactSource {
    pub fn new(
        base_url: &str,
        cache_dir: impl Into<PathBuf>,
        files: ArtifactFiles,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
            files,
        }
    }

    pub fn object_url(&self, ticker: &str, file: &str) -> String {
        format!("{}/{}/{}", self.base_url, ticker, file)
    }

    async fn download(&self, ticker: &str, file: &str, dest: &Path) -> Result<()> {
        let url = self.object_url(ticker, file);
        debug!("Object store download: {}", url);

        let resp = self.client.get(&url).send().await?;
        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
                return Err(StockcastError::ArtifactNotFound(format!("{} for {}", url, ticker)));
            }
            s => {
                return Err(StockcastError::UpstreamUnavailable(format!("{} returned {}", url, s)));
            }
        }
        let bytes = resp.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactSource for ObjectStoreArtifactSource {
    fn name(&self) -> &str {
        "object_store"
    }

    async fn locate(&self, ticker: &str) -> Result<ArtifactPaths> {
        check_ticker(ticker)?;
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-", ticker))
            .tempdir_in(&self.cache_dir)?;

        for file in self.files.names() {
            self.download(ticker, file, &scratch.path().join(file)).await?;
        }
        info!("Downloaded artifacts for {} into {}", ticker, scratch.path().display());
        let files = &self.files;
        Ok(ArtifactPaths::in_scratch(scratch, &files.model, &files.scaler, &files.series))
    }
}

pub fn build_artifact_source(config: &ArtifactConfig) -> Arc<dyn ArtifactSource> {
    let files = ArtifactFiles::from_config(config);
    match config.source {
        ArtifactSourceKind::Local => Arc::new(LocalArtifactSource::new(config.root.clone(), files)),
        ArtifactSourceKind::ObjectStore => Arc::new(ObjectStoreArtifactSource::new(
            &config.base_url,
            config.cache_dir.clone(),
            files,
            Duration::from_secs(config.timeout_secs),
        )),
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Everything one forecast request needs, owned by that request.
pub struct TickerArtifacts {
    pub model: Box<dyn PriceModel>,
    pub scaler: MinMaxScaler,
    pub series: PriceSeries,
}

pub fn load_artifacts(
    paths: &ArtifactPaths,
    ticker: &str,
    options: ModelOptions,
) -> Result<TickerArtifacts> {
    let model = load_model(&paths.model, options)?;
    let scaler = MinMaxScaler::load(&paths.scaler)?;
    let series = read_price_csv(&paths.series, ticker)?;
    Ok(TickerArtifacts { model, scaler, series })
}
