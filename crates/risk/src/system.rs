// Stock clustering pipeline: market data → features → standardize → k-means → risk labels.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use ndarray::Array2;
use tracing::{info, warn};

use stockcast_core::error::Result;
use stockcast_core::models::{Bar, Fundamentals};
use stockcast_core::traits::MarketDataProvider;
use stockcast_core::types::RiskLabel;
use stockcast_ml::kmeans::{silhouette_score, KMeans, KMeansConfig};
use stockcast_ml::scaler::StandardScaler;

use crate::features::{
    return_stats, technical_stats, FeatureRow, ReturnStats, TechnicalStats, NUM_FEATURES,
};
use crate::labels::{label_clusters, ClusterProfile};

pub struct StockClusteringSystem {
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    provider: Arc<dyn MarketDataProvider>,
    kmeans_config: KMeansConfig,

    data: HashMap<String, Vec<Bar>>,
    fundamentals: HashMap<String, Fundamentals>,
    features: Vec<FeatureRow>,
    scaled: Array2<f64>,
    assignments: Vec<usize>,
    silhouette: Option<f64>,
}

impl StockClusteringSystem {
    pub fn new(
        tickers: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self {
            tickers,
            start,
            end,
            provider,
            kmeans_config: KMeansConfig::default(),
            data: HashMap::new(),
            fundamentals: HashMap::new(),
            features: Vec::new(),
            scaled: Array2::zeros((0, NUM_FEATURES)),
            assignments: Vec::new(),
            silhouette: None,
        }
    }

    /// Seed, restarts and iteration limits for k-means. `n_clusters` is
    /// overridden by [`perform_clustering`](Self::perform_clustering).
    pub fn with_kmeans_config(mut self, config: KMeansConfig) -> Self {
        self.kmeans_config = config;
        self
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Download price history and fundamentals for every ticker.
    ///
    /// Failures are logged and leave the ticker without data; its features
    /// end up `NaN` (history) or `0.0` (fundamentals).
    pub async fn fetch_data(&mut self) {
        let tickers = self.tickers.clone();
        for ticker in &tickers {
            match self.provider.fetch_history(ticker, self.start, self.end).await {
                Ok(bars) => {
                    info!("Fetched {} bars for {}", bars.len(), ticker);
                    self.data.insert(ticker.clone(), bars);
                }
                Err(e) => warn!("Failed to fetch history for {}: {}", ticker, e),
            }

            let fundamentals = match self.provider.fetch_fundamentals(ticker).await {
                Ok(f) => f,
                Err(e) => {
                    warn!("Failed to fetch fundamentals for {}: {}", ticker, e);
                    Fundamentals::default()
                }
            };
            self.fundamentals.insert(ticker.clone(), fundamentals);
        }
    }

    fn bars(&self, ticker: &str) -> &[Bar] {
        self.data.get(ticker).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn calculate_returns(&self, ticker: &str) -> ReturnStats {
        return_stats(self.bars(ticker))
    }

    pub fn calculate_technical_indicators(&self, ticker: &str) -> TechnicalStats {
        technical_stats(self.bars(ticker))
    }

    pub fn calculate_financial_metrics(&self, ticker: &str) -> Fundamentals {
        self.fundamentals.get(ticker).copied().unwrap_or_default()
    }

    /// One feature row per ticker, in ticker order.
    pub fn create_feature_matrix(&mut self) {
        self.features = self
            .tickers
            .iter()
            .map(|ticker| {
                FeatureRow::new(
                    ticker,
                    self.calculate_returns(ticker),
                    self.calculate_technical_indicators(ticker),
                    self.calculate_financial_metrics(ticker),
                )
            })
            .collect();
    }

    /// Replace ±∞ with NaN, fill NaN with the column mean, then standardize.
    pub fn preprocess_features(&mut self) -> Result<()> {
        let mut matrix = Array2::zeros((self.features.len(), NUM_FEATURES));
        for (i, row) in self.features.iter().enumerate() {
            for (j, v) in row.values.iter().enumerate() {
                matrix[[i, j]] = *v;
            }
        }
        impute_column_means(&mut matrix);

        for (row, imputed) in self.features.iter_mut().zip(matrix.rows()) {
            for (v, x) in row.values.iter_mut().zip(imputed.iter()) {
                *v = *x;
            }
        }

        let mut scaler = StandardScaler::new();
        self.scaled = scaler.fit_transform(&matrix)?;
        Ok(())
    }

    pub fn perform_clustering(&mut self, n_clusters: usize) -> Result<()> {
        let n = self.scaled.nrows();
        if n == 0 {
            warn!("No feature rows to cluster");
            self.assignments.clear();
            self.silhouette = None;
            return Ok(());
        }

        let mut k = n_clusters;
        if k > n {
            warn!("Requested {} clusters but only {} tickers; using {}", k, n, n);
            k = n;
        }
        let config = KMeansConfig {
            n_clusters: k,
            ..self.kmeans_config.clone()
        };

        let km = KMeans::fit(&self.scaled, &config)?;
        self.silhouette = silhouette_score(&self.scaled, &km.labels);
        match self.silhouette {
            Some(s) => info!("Silhouette score: {:.4}", s),
            None => info!("Silhouette score undefined for {} clusters over {} tickers", k, n),
        }
        self.assignments = km.labels;
        Ok(())
    }

    pub fn silhouette(&self) -> Option<f64> {
        self.silhouette
    }

    /// Imputed (unscaled) feature rows.
    pub fn features(&self) -> &[FeatureRow] {
        &self.features
    }

    pub fn scaled_features(&self) -> &Array2<f64> {
        &self.scaled
    }

    /// Cluster id of each ticker, in ticker order. Empty before clustering.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn cluster_profiles(&self) -> Vec<ClusterProfile> {
        if self.assignments.is_empty() {
            return Vec::new();
        }
        let profiles = label_clusters(&self.features, &self.assignments);
        for p in &profiles {
            info!(
                cluster = p.cluster,
                size = p.size,
                risk_score = p.risk_score,
                label = %p.label,
                "Cluster risk score"
            );
        }
        profiles
    }

    pub fn get_cluster_characteristics(&self) -> BTreeMap<usize, RiskLabel> {
        self.cluster_profiles()
            .into_iter()
            .map(|p| (p.cluster, p.label))
            .collect()
    }

    /// Tickers of every cluster carrying `label`, in cluster-id then ticker order.
    pub fn get_recommendations(&self, label: RiskLabel) -> Vec<String> {
        let mapping = self.get_cluster_characteristics();
        if mapping.is_empty() {
            warn!("No valid risk mappings found");
            return Vec::new();
        }

        let matching: Vec<usize> = mapping
            .iter()
            .filter(|(_, l)| **l == label)
            .map(|(c, _)| *c)
            .collect();
        if matching.is_empty() {
            warn!("No clusters found for risk preference '{}'", label);
            return Vec::new();
        }

        let mut out = Vec::new();
        for cluster in matching {
            out.extend(
                self.tickers
                    .iter()
                    .zip(&self.assignments)
                    .filter(|(_, c)| **c == cluster)
                    .map(|(t, _)| t.clone()),
            );
        }
        out
    }
}

/// Non-finite entries become the mean of the finite values in their column,
/// or 0.0 when a column has none.
pub fn impute_column_means(matrix: &mut Array2<f64>) {
    for mut column in matrix.columns_mut() {
        let (sum, count) = column
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        let fill = if count == 0 { 0.0 } else { sum / count as f64 };
        column.mapv_inplace(|v| if v.is_finite() { v } else { fill });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use async_trait::async_trait;
    use ndarray::array;
    use stockcast_core::error::StockcastError;

    /// Synthetic provider: each ticker prefix picks a volatility regime.
    struct MockProvider;

    fn regime(symbol: &str) -> Option<(f64, f64, f64)> {
        // (amplitude, drift, beta)
        if symbol.starts_with("LO") {
            Some((0.5, 0.01, 0.5))
        } else if symbol.starts_with("MID") {
            Some((2.0, 0.05, 1.0))
        } else if symbol.starts_with("HI") {
            Some((6.0, 0.2, 2.0))
        } else {
            None
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn fetch_history(&self, symbol: &str, start: NaiveDate, _end: NaiveDate) -> Result<Vec<Bar>> {
            let (amp, drift, _) = regime(symbol)
                .ok_or_else(|| StockcastError::UpstreamUnavailable(format!("no data for {}", symbol)))?;
            Ok((0..260)
                .map(|t| {
                    let close = 100.0 + drift * t as f64 + amp * (t as f64).sin();
                    Bar {
                        symbol: symbol.to_string(),
                        date: start + chrono::Duration::days(t),
                        open: close,
                        high: close,
                        low: close,
                        close,
                        volume: 1e6,
                    }
                })
                .collect())
        }

        async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
            let (_, _, beta) = regime(symbol)
                .ok_or_else(|| StockcastError::UpstreamUnavailable(format!("no data for {}", symbol)))?;
            Ok(Fundamentals {
                pe_ratio: 20.0 * beta,
                dividend_yield: 0.02 / beta,
                market_cap: 1e11,
                beta,
            })
        }
    }

    fn system(tickers: &[&str]) -> StockClusteringSystem {
        StockClusteringSystem::new(
            tickers.iter().map(|t| t.to_string()).collect(),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            Arc::new(MockProvider),
        )
    }

    async fn run(tickers: &[&str], k: usize) -> StockClusteringSystem {
        let mut sys = system(tickers);
        sys.fetch_data().await;
        sys.create_feature_matrix();
        sys.preprocess_features().unwrap();
        sys.perform_clustering(k).unwrap();
        sys
    }

    #[tokio::test]
    async fn test_three_regimes_three_labels() {
        let sys = run(&["LO1", "HI1", "MID1", "LO2", "HI2", "MID2"], 3).await;

        let mapping = sys.get_cluster_characteristics();
        assert_eq!(mapping.len(), 3);
        for label in RiskLabel::all() {
            assert_eq!(mapping.values().filter(|l| **l == label).count(), 1, "{}", label);
        }

        assert_eq!(sys.get_recommendations(RiskLabel::Aggressive), vec!["HI1", "HI2"]);
        assert_eq!(sys.get_recommendations(RiskLabel::Conservative), vec!["LO1", "LO2"]);
        assert_eq!(sys.get_recommendations(RiskLabel::Moderate), vec!["MID1", "MID2"]);

        let s = sys.silhouette().unwrap();
        assert!(s > 0.5, "silhouette {}", s);
    }

    #[tokio::test]
    async fn test_unmatched_label_is_empty() {
        // Two clusters: Aggressive and Conservative, nobody is Moderate.
        let sys = run(&["LO1", "HI1"], 2).await;
        assert!(sys.get_recommendations(RiskLabel::Moderate).is_empty());
        assert_eq!(sys.get_recommendations(RiskLabel::Aggressive), vec!["HI1"]);
    }

    #[tokio::test]
    async fn test_clusters_clamped_to_ticker_count() {
        let sys = run(&["LO1", "HI1"], 5).await;
        assert_eq!(sys.get_cluster_characteristics().len(), 2);
        assert!(sys.silhouette().is_none());
    }

    #[tokio::test]
    async fn test_failed_ticker_is_imputed() {
        let sys = run(&["LO1", "BAD", "HI1"], 2).await;
        assert_eq!(sys.features().len(), 3);
        assert!(sys.scaled_features().iter().all(|v| v.is_finite()));
        assert_eq!(sys.calculate_financial_metrics("BAD"), Fundamentals::default());
        assert!(sys.calculate_returns("BAD").daily_return_mean.is_nan());
        assert_eq!(sys.assignments().len(), 3);
    }

    #[tokio::test]
    async fn test_no_tickers() {
        let sys = run(&[], 3).await;
        assert!(sys.get_cluster_characteristics().is_empty());
        assert!(sys.get_recommendations(RiskLabel::Moderate).is_empty());
        assert!(sys.cluster_profiles().is_empty());
    }

    #[test]
    fn test_impute_column_means() {
        let mut m = array![
            [1.0, f64::NAN],
            [3.0, f64::INFINITY],
            [f64::NAN, f64::NEG_INFINITY]
        ];
        impute_column_means(&mut m);
        assert_abs_diff_eq!(m[[2, 0]], 2.0);
        assert_eq!(m.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }
}
