// Request-scoped forecasting: locate artifacts, scale, roll the model forward, unscale.

use std::sync::Arc;

use tracing::{debug, info};

use stockcast_config::ForecastConfig;
use stockcast_core::error::{Result, StockcastError};
use stockcast_core::traits::ArtifactSource;
use stockcast_core::utils::normalize_ticker;
use stockcast_data::artifacts::load_artifacts;
use stockcast_ml::forecast::extended_forecast;
use stockcast_ml::model::ModelOptions;

pub struct ForecastService {
    source: Arc<dyn ArtifactSource>,
    config: ForecastConfig,
}

impl ForecastService {
    pub fn new(source: Arc<dyn ArtifactSource>, config: ForecastConfig) -> Self {
        Self { source, config }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Validate `steps`, falling back to the configured default.
    pub fn resolve_steps(&self, steps: Option<usize>) -> Result<usize> {
        let steps = steps.unwrap_or(self.config.default_steps);
        if steps == 0 {
            return Err(StockcastError::InvalidRequest("steps must be at least 1".into()));
        }
        if steps > self.config.max_steps {
            return Err(StockcastError::InvalidRequest(format!(
                "steps {} exceeds the maximum of {}",
                steps, self.config.max_steps
            )));
        }
        Ok(steps)
    }

    /// Forecast `steps` future prices for `stock` in the original price units.
    pub async fn predict(&self, stock: &str, steps: Option<usize>) -> Result<Vec<f64>> {
        let ticker = normalize_ticker(stock);
        if ticker.is_empty() {
            return Err(StockcastError::InvalidRequest("stock must not be empty".into()));
        }
        let steps = self.resolve_steps(steps)?;

        let paths = self.source.locate(&ticker).await?;
        let options = ModelOptions {
            onnx_recurrent_input: self.config.onnx_recurrent_input,
        };
        let artifacts = load_artifacts(&paths, &ticker, options)?;
        let prices = artifacts.series.prices();
        debug!(
            "Loaded {} prices and {} model for {} from {}",
            prices.len(),
            artifacts.model.name(),
            ticker,
            self.source.name()
        );

        let mut scaler = artifacts.scaler;
        if self.config.refit_scaler || !scaler.is_fitted() {
            scaler.fit(&prices)?;
        }
        let scaled = scaler.transform(&prices)?;

        let forecast = extended_forecast(
            artifacts.model.as_ref(),
            &scaled,
            self.config.window_size,
            steps,
        )?;
        let predictions = scaler.inverse_transform(&forecast)?;

        info!("Forecast {} steps for {}", predictions.len(), ticker);
        Ok(predictions)
    }
}
