use std::sync::Arc;

use stockcast_config::AppConfig;
use stockcast_core::traits::ArtifactSource;
use stockcast_data::artifacts::build_artifact_source;

use crate::service::ForecastService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub forecaster: Arc<ForecastService>,
}

impl AppState {
    /// Build the artifact source named by `config.artifacts`.
    pub fn new(config: AppConfig) -> Self {
        let source = build_artifact_source(&config.artifacts);
        Self::with_source(config, source)
    }

    pub fn with_source(config: AppConfig, source: Arc<dyn ArtifactSource>) -> Self {
        let forecaster = Arc::new(ForecastService::new(source, config.forecast.clone()));
        Self { config, forecaster }
    }
}
