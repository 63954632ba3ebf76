use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── Price History ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub datetime: NaiveDateTime,
    pub price: f64,
}

/// Ordered price history for one ticker. Timestamps are carried along but
/// only the prices feed the forecaster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ── Market Data ──────────────────────────────────────────────

/// Daily bar as returned by a market data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Fundamental metrics. Fields missing upstream are reported as 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub pe_ratio: f64,
    pub dividend_yield: f64,
    pub market_cap: f64,
    pub beta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prices_keep_point_order() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let series = PriceSeries::new(
            "AAPL",
            vec![
                PricePoint { datetime: day(2), price: 3.0 },
                PricePoint { datetime: day(3), price: 1.0 },
                PricePoint { datetime: day(4), price: 4.0 },
            ],
        );
        assert_eq!(series.prices(), vec![3.0, 1.0, 4.0]);
        assert_eq!(series.len(), 3);
        assert!(!series.is_empty());
        assert!(PriceSeries::default().is_empty());
    }
}
