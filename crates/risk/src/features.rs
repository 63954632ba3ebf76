//! Per-ticker feature engineering for risk clustering.
//!
//! Every ticker yields one [`FeatureRow`] with the columns listed in
//! [`FEATURE_NAMES`]. Values that cannot be computed (too little history,
//! failed downloads) are `NaN` and get imputed during preprocessing.

use chrono::Datelike;
use serde::Serialize;

use stockcast_core::models::{Bar, Fundamentals};

use crate::indicators::{last_sma, mean_defined, MACD, RSI};

pub const NUM_FEATURES: usize = 11;

pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "daily_return_mean",
    "daily_return_std",
    "monthly_return_mean",
    "yearly_return_mean",
    "rsi_mean",
    "macd_diff_mean",
    "ma50_ma200_ratio",
    "pe_ratio",
    "dividend_yield",
    "market_cap",
    "beta",
];

pub const DAILY_RETURN_MEAN: usize = 0;
pub const DAILY_RETURN_STD: usize = 1;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const MA_SHORT: usize = 50;
const MA_LONG: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnStats {
    pub daily_return_mean: f64,
    /// Sample standard deviation of daily returns (volatility).
    pub daily_return_std: f64,
    pub monthly_return_mean: f64,
    pub yearly_return_mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TechnicalStats {
    pub rsi_mean: f64,
    pub macd_diff_mean: f64,
    pub ma50_ma200_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub ticker: String,
    pub values: [f64; NUM_FEATURES],
}

impl FeatureRow {
    pub fn new(
        ticker: &str,
        returns: ReturnStats,
        technical: TechnicalStats,
        financial: Fundamentals,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            values: [
                returns.daily_return_mean,
                returns.daily_return_std,
                returns.monthly_return_mean,
                returns.yearly_return_mean,
                technical.rsi_mean,
                technical.macd_diff_mean,
                technical.ma50_ma200_ratio,
                financial.pe_ratio,
                financial.dividend_yield,
                financial.market_cap,
                financial.beta,
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES.iter().position(|n| *n == name).map(|i| self.values[i])
    }
}

/// Percentage change between consecutive values.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

fn mean(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        f64::NAN
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

fn sample_std(values: &[f64]) -> f64 {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return f64::NAN;
    }
    let m = finite.iter().sum::<f64>() / finite.len() as f64;
    let var = finite.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (finite.len() - 1) as f64;
    var.sqrt()
}

/// Last close of each calendar period, keyed by `period_of(bar)`, in date order.
fn period_closes<K: PartialEq>(bars: &[Bar], period_of: impl Fn(&Bar) -> K) -> Vec<f64> {
    let mut out: Vec<(K, f64)> = Vec::new();
    for bar in bars {
        let key = period_of(bar);
        match out.last_mut() {
            Some((k, close)) if *k == key => *close = bar.close,
            _ => out.push((key, bar.close)),
        }
    }
    out.into_iter().map(|(_, c)| c).collect()
}

pub fn return_stats(bars: &[Bar]) -> ReturnStats {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let daily = pct_change(&closes);
    let monthly = pct_change(&period_closes(bars, |b| (b.date.year(), b.date.month())));
    let yearly = pct_change(&period_closes(bars, |b| b.date.year()));

    ReturnStats {
        daily_return_mean: mean(&daily),
        daily_return_std: sample_std(&daily),
        monthly_return_mean: mean(&monthly),
        yearly_return_mean: mean(&yearly),
    }
}

pub fn technical_stats(bars: &[Bar]) -> TechnicalStats {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let mut rsi = RSI::new(RSI_PERIOD);
    let rsi_mean = mean_defined(&closes, |c| rsi.update(c));

    let mut macd = MACD::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let macd_diff_mean = mean_defined(&closes, |c| macd.update(c));

    let ma50_ma200_ratio = match (last_sma(&closes, MA_SHORT), last_sma(&closes, MA_LONG)) {
        (Some(short), Some(long)) => short / long,
        _ => f64::NAN,
    };

    TechnicalStats {
        rsi_mean,
        macd_diff_mean,
        ma50_ma200_ratio,
    }
}
