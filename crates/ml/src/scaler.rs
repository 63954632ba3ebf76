//! Feature scalers.
//!
//! `MinMaxScaler` maps prices into a bounded range for the forecasting models
//! and back again; `StandardScaler` centres and scales clustering features
//! column by column.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use stockcast_core::error::{Result, StockcastError};

/// Affine min-max transform `x -> (x - min) / (max - min) * (hi - lo) + lo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub feature_range: (f64, f64),
    #[serde(default)]
    pub data_min: Option<f64>,
    #[serde(default)]
    pub data_max: Option<f64>,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new((0.0, 1.0))
    }
}

impl MinMaxScaler {
    pub fn new(feature_range: (f64, f64)) -> Self {
        Self {
            feature_range,
            data_min: None,
            data_max: None,
        }
    }

    /// Load a persisted scaler (JSON).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                StockcastError::ArtifactNotFound(format!("scaler {}", path.display()))
            }
            _ => StockcastError::Io(format!("{}: {}", path.display(), e)),
        })?;
        let scaler: Self = serde_json::from_str(&content)?;
        let (lo, hi) = scaler.feature_range;
        if !(lo < hi) {
            return Err(StockcastError::DataError(format!(
                "scaler {} has an invalid feature range ({}, {})",
                path.display(),
                lo,
                hi
            )));
        }
        Ok(scaler)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.data_min.is_some() && self.data_max.is_some()
    }

    pub fn fit(&mut self, values: &[f64]) -> Result<()> {
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !lo.is_finite() || !hi.is_finite() {
            return Err(StockcastError::DataError(
                "cannot fit scaler on a series without finite values".into(),
            ));
        }
        self.data_min = Some(lo);
        self.data_max = Some(hi);
        Ok(())
    }

    pub fn fit_transform(&mut self, values: &[f64]) -> Result<Vec<f64>> {
        self.fit(values)?;
        self.transform(values)
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        let (scale, offset) = self.coefficients()?;
        Ok(values.iter().map(|v| v * scale + offset).collect())
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        let (scale, offset) = self.coefficients()?;
        Ok(values.iter().map(|v| (v - offset) / scale).collect())
    }

    /// `(scale, offset)` such that `scaled = x * scale + offset`.
    fn coefficients(&self) -> Result<(f64, f64)> {
        let (Some(min), Some(max)) = (self.data_min, self.data_max) else {
            return Err(StockcastError::ModelError("scaler is not fitted".into()));
        };
        let (lo, hi) = self.feature_range;
        // A constant series keeps unit range so the inverse stays defined.
        let data_range = if max - min == 0.0 { 1.0 } else { max - min };
        let scale = (hi - lo) / data_range;
        Ok((scale, lo - min * scale))
    }
}

/// Column-wise standardization with population standard deviation.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, data: &Array2<f64>) {
        if data.nrows() == 0 {
            self.mean = Some(Array1::zeros(data.ncols()));
            self.scale = Some(Array1::ones(data.ncols()));
            return;
        }
        let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(data.ncols()));
        let scale = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });
        self.mean = Some(mean);
        self.scale = Some(scale);
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(StockcastError::ModelError("standard scaler is not fitted".into()));
        };
        if data.ncols() != mean.len() {
            return Err(StockcastError::DataError(format!(
                "expected {} columns, got {}",
                mean.len(),
                data.ncols()
            )));
        }
        Ok((data - mean) / scale)
    }

    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(data);
        self.transform(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_minmax_round_trip() {
        let prices = [101.5, 99.2, 130.7, 87.1, 112.0];
        let mut scaler = MinMaxScaler::default();
        let scaled = scaler.fit_transform(&prices).unwrap();
        assert_abs_diff_eq!(scaled.iter().cloned().fold(f64::INFINITY, f64::min), 0.0);
        assert_abs_diff_eq!(scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 1.0);

        let restored = scaler.inverse_transform(&scaled).unwrap();
        for (a, b) in prices.iter().zip(restored.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_minmax_custom_range() {
        let mut scaler = MinMaxScaler::new((-1.0, 1.0));
        let scaled = scaler.fit_transform(&[10.0, 15.0, 20.0]).unwrap();
        assert_abs_diff_eq!(scaled[0], -1.0);
        assert_abs_diff_eq!(scaled[1], 0.0);
        assert_abs_diff_eq!(scaled[2], 1.0);
    }

    #[test]
    fn test_minmax_constant_series() {
        let mut scaler = MinMaxScaler::default();
        let scaled = scaler.fit_transform(&[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(scaled, vec![0.0, 0.0, 0.0]);
        assert_eq!(scaler.inverse_transform(&scaled).unwrap(), vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_minmax_unfitted_errors() {
        let scaler = MinMaxScaler::default();
        assert!(scaler.transform(&[1.0]).is_err());
        assert!(scaler.inverse_transform(&[1.0]).is_err());
    }

    #[test]
    fn test_minmax_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        let mut scaler = MinMaxScaler::default();
        scaler.fit(&[1.0, 3.0]).unwrap();
        scaler.save(&path).unwrap();

        let loaded = MinMaxScaler::load(&path).unwrap();
        assert_eq!(loaded, scaler);
        assert!(loaded.is_fitted());
    }

    #[test]
    fn test_minmax_range_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, r#"{"feature_range": [0.0, 1.0]}"#).unwrap();
        let loaded = MinMaxScaler::load(&path).unwrap();
        assert!(!loaded.is_fitted());
    }

    #[test]
    fn test_minmax_missing_file() {
        let err = MinMaxScaler::load("/nonexistent/scaler.json").unwrap_err();
        assert!(matches!(err, StockcastError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_standard_scaler() {
        let data = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        // population std of [1,2,3] = sqrt(2/3)
        let s = (2.0f64 / 3.0).sqrt();
        assert_abs_diff_eq!(scaled[[0, 0]], -1.0 / s, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[[1, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scaled[[2, 0]], 1.0 / s, epsilon = 1e-12);
        // zero variance column is centred, not divided by zero
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }
}
