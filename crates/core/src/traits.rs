use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Bar, Fundamentals};
use crate::types::ArtifactPaths;

/// A fitted model mapping a fixed-length input window to one prediction.
pub trait PriceModel: Send + Sync {
    fn name(&self) -> &str;
    fn predict(&self, window: &[f64]) -> Result<f64>;
}

impl<F> PriceModel for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn name(&self) -> &str {
        "closure"
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        Ok(self(window))
    }
}

/// Where the per-ticker model, scaler and price CSV live.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve (and, for remote sources, download) the artifacts of `ticker`.
    /// `ticker` is expected to be uppercased already.
    async fn locate(&self, ticker: &str) -> Result<ArtifactPaths>;
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars in ascending date order, `start` inclusive, `end` exclusive.
    async fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>>;

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}
