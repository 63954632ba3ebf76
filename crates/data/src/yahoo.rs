use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use stockcast_core::error::{Result, StockcastError};
use stockcast_core::models::{Bar, Fundamentals};
use stockcast_core::traits::MarketDataProvider;

/// Yahoo Finance chart + quote-summary client.
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent("Mozilla/5.0")
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("Yahoo request: {}", url);
        let resp = self.client.get(url).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json().await?),
            StatusCode::NOT_FOUND => Err(StockcastError::DataError(format!("{} not found", url))),
            s => Err(StockcastError::UpstreamUnavailable(format!("Yahoo returned {} for {}", s, url))),
        }
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>> {
        let period1 = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        let period2 = end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div,splits&includeAdjustedClose=true",
            self.base_url, symbol, period1, period2
        );
        let json = self.get_json(&url).await?;
        parse_chart(&json, symbol)
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=summaryDetail,defaultKeyStatistics",
            self.base_url, symbol
        );
        let json = self.get_json(&url).await?;
        parse_fundamentals(&json, symbol)
    }
}

/// Parse a `/v8/finance/chart` payload into daily bars, dropping rows without a close.
///
/// Bars are adjusted for splits and dividends: when the payload carries
/// `adjclose`, the close is replaced by it and open/high/low are scaled by
/// `adjclose / close`. Rows without an adjusted close keep the raw prices.
pub fn parse_chart(json: &Value, symbol: &str) -> Result<Vec<Bar>> {
    if let Some(err) = json["chart"]["error"].as_object() {
        let desc = err.get("description").and_then(|d| d.as_str()).unwrap_or("unknown error");
        return Err(StockcastError::DataError(format!("Yahoo chart error for {}: {}", symbol, desc)));
    }
    let chart = &json["chart"]["result"][0];
    let Some(timestamps) = chart["timestamp"].as_array() else {
        // No trading days in range.
        return Ok(Vec::new());
    };

    let quote = &chart["indicators"]["quote"][0];
    let column = |name: &str, i: usize| quote[name].get(i).and_then(|v| v.as_f64());
    let adjclose = &chart["indicators"]["adjclose"][0]["adjclose"];

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(date) = ts.as_i64().and_then(|t| DateTime::from_timestamp(t, 0)).map(|dt| dt.date_naive())
        else {
            continue;
        };
        let Some(raw_close) = column("close", i) else {
            continue;
        };
        let (close, factor) = match adjclose.get(i).and_then(|v| v.as_f64()) {
            Some(adj) if raw_close != 0.0 => (adj, adj / raw_close),
            _ => (raw_close, 1.0),
        };
        let adjusted = |name: &str| column(name, i).map_or(close, |v| v * factor);
        bars.push(Bar {
            symbol: symbol.to_string(),
            date,
            open: adjusted("open"),
            high: adjusted("high"),
            low: adjusted("low"),
            close,
            volume: column("volume", i).unwrap_or(0.0),
        });
    }
    Ok(bars)
}

/// Parse a `/v10/finance/quoteSummary` payload. Absent fields become 0.0.
pub fn parse_fundamentals(json: &Value, symbol: &str) -> Result<Fundamentals> {
    let result = &json["quoteSummary"]["result"][0];
    if result.is_null() {
        return Err(StockcastError::DataError(format!("no quote summary for {}", symbol)));
    }
    let summary = &result["summaryDetail"];
    let stats = &result["defaultKeyStatistics"];
    let raw = |v: &Value| -> Option<f64> { v["raw"].as_f64().or_else(|| v.as_f64()) };
    let first = |key: &str| raw(&summary[key]).or_else(|| raw(&stats[key])).unwrap_or(0.0);

    Ok(Fundamentals {
        pe_ratio: first("forwardPE"),
        dividend_yield: first("dividendYield"),
        market_cap: first("marketCap"),
        beta: first("beta"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_chart() {
        let payload = json!({
            "chart": {
                "result": [{
                    "timestamp": [1704205800, 1704292200, 1704378600],
                    "indicators": {"quote": [{
                        "open": [187.15, 184.22, null],
                        "high": [188.44, 185.88, null],
                        "low": [183.89, 183.43, null],
                        "close": [185.64, 184.25, null],
                        "volume": [82488700, 58414500, null]
                    }]}
                }],
                "error": null
            }
        });
        let bars = parse_chart(&payload, "AAPL").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date.to_string(), "2024-01-02");
        assert_eq!(bars[1].close, 184.25);
    }

    #[test]
    fn test_parse_chart_adjusts_for_split() {
        // 2:1 split between the two sessions
        let payload = json!({
            "chart": {
                "result": [{
                    "timestamp": [1704205800, 1704292200],
                    "indicators": {
                        "quote": [{
                            "open": [198.0, 100.0],
                            "high": [204.0, 102.0],
                            "low": [196.0, 99.0],
                            "close": [200.0, 101.0],
                            "volume": [1000, 2000]
                        }],
                        "adjclose": [{"adjclose": [100.0, 101.0]}]
                    }
                }],
                "error": null
            }
        });
        let bars = parse_chart(&payload, "AAPL").unwrap();
        assert_eq!(bars[0].close, 100.0);
        assert_eq!(bars[0].open, 99.0);
        assert_eq!(bars[0].high, 102.0);
        assert_eq!(bars[0].low, 98.0);
        assert_eq!(bars[0].volume, 1000.0);
        assert_eq!(bars[1].close, 101.0);
        assert_eq!(bars[1].open, 100.0);

        let daily = bars[1].close / bars[0].close - 1.0;
        assert!((daily - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_parse_chart_error() {
        let payload = json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}});
        let err = parse_chart(&payload, "XXXX").unwrap_err();
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn test_parse_chart_empty_range() {
        let payload = json!({"chart": {"result": [{"indicators": {"quote": [{}]}}], "error": null}});
        assert!(parse_chart(&payload, "AAPL").unwrap().is_empty());
    }

    #[test]
    fn test_parse_fundamentals_missing_fields() {
        let payload = json!({
            "quoteSummary": {"result": [{
                "summaryDetail": {"forwardPE": {"raw": 28.4, "fmt": "28.40"}, "marketCap": {"raw": 2.9e12}},
                "defaultKeyStatistics": {"beta": {"raw": 1.29}}
            }]}
        });
        let f = parse_fundamentals(&payload, "AAPL").unwrap();
        assert_eq!(f.pe_ratio, 28.4);
        assert_eq!(f.market_cap, 2.9e12);
        assert_eq!(f.beta, 1.29);
        assert_eq!(f.dividend_yield, 0.0);
    }

    #[test]
    fn test_parse_fundamentals_no_result() {
        let payload = json!({"quoteSummary": {"result": null, "error": {"code": "Not Found"}}});
        assert!(parse_fundamentals(&payload, "XXXX").is_err());
    }
}
