// Historical price CSV parsing.
//
// Files are yfinance-style exports: a header line, two descriptive rows
// (ticker / blank "Date" row) that are skipped, then one row per day. The
// first column is named `Price` in the header and holds the date; the
// `Adj Close` column is the series.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use stockcast_core::error::{Result, StockcastError};
use stockcast_core::models::{PricePoint, PriceSeries};
use stockcast_core::utils::parse_timestamp;

const DESCRIPTIVE_ROWS: usize = 2;
const DATE_COLUMNS: [&str; 2] = ["Price", "Date"];
const PRICE_COLUMN: &str = "Adj Close";

pub fn read_price_csv(path: &Path, symbol: &str) -> Result<PriceSeries> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            StockcastError::ArtifactNotFound(format!("price data {}", path.display()))
        }
        _ => StockcastError::Io(format!("{}: {}", path.display(), e)),
    })?;
    let series = parse_price_csv(file, symbol)?;
    tracing::debug!("Loaded {} prices for {} from {}", series.len(), symbol, path.display());
    Ok(series)
}

pub fn parse_price_csv<R: Read>(reader: R, symbol: &str) -> Result<PriceSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let date_idx = headers
        .iter()
        .position(|h| DATE_COLUMNS.contains(&h))
        .ok_or_else(|| StockcastError::DataError("price CSV has no Price/Date column".into()))?;
    let price_idx = headers
        .iter()
        .position(|h| h == PRICE_COLUMN)
        .ok_or_else(|| StockcastError::DataError(format!("price CSV has no '{}' column", PRICE_COLUMN)))?;

    let mut points = Vec::new();
    for (row, record) in rdr.records().enumerate().skip(DESCRIPTIVE_ROWS) {
        let record = record?;
        let line = row + 2;
        let raw_date = record.get(date_idx).unwrap_or_default();
        let datetime = parse_timestamp(raw_date).ok_or_else(|| {
            StockcastError::DataError(format!("line {}: bad date '{}'", line, raw_date))
        })?;
        let raw_price = record.get(price_idx).unwrap_or_default();
        let price: f64 = raw_price.parse().map_err(|_| {
            StockcastError::DataError(format!("line {}: bad price '{}'", line, raw_price))
        })?;
        points.push(PricePoint { datetime, price });
    }

    if points.is_empty() {
        return Err(StockcastError::DataError(format!("no price rows for {}", symbol)));
    }

    Ok(PriceSeries::new(symbol, points))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Price,Adj Close,Close,High,Low,Open,Volume
Ticker,AAPL,AAPL,AAPL,AAPL,AAPL,AAPL
Date,,,,,,
2024-01-02 00:00:00+00:00,184.73,185.64,188.44,183.89,187.15,82488700
2024-01-03,183.35,184.25,185.88,183.43,184.22,58414500
2024-01-04,181.02,181.91,183.09,180.88,182.15,71983600
";

    #[test]
    fn test_parse_skips_descriptive_rows() {
        let series = parse_price_csv(SAMPLE.as_bytes(), "AAPL").unwrap();
        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.prices(), vec![184.73, 183.35, 181.02]);
        assert_eq!(series.points[1].datetime.to_string(), "2024-01-03 00:00:00");
    }

    #[test]
    fn test_missing_adj_close_column() {
        let csv = "Price,Close\nTicker,AAPL\nDate,\n2024-01-02,1.0\n";
        let err = parse_price_csv(csv.as_bytes(), "AAPL").unwrap_err();
        assert!(matches!(err, StockcastError::DataError(_)));
    }

    #[test]
    fn test_bad_price_reports_line() {
        let csv = "Price,Adj Close\nTicker,AAPL\nDate,\n2024-01-02,abc\n";
        let err = parse_price_csv(csv.as_bytes(), "AAPL").unwrap_err();
        assert!(err.to_string().contains("line 4"), "{}", err);
    }

    #[test]
    fn test_header_only_is_error() {
        let csv = "Price,Adj Close\nTicker,AAPL\nDate,\n";
        assert!(parse_price_csv(csv.as_bytes(), "AAPL").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_price_csv(Path::new("/nonexistent/data.csv"), "AAPL").unwrap_err();
        assert!(matches!(err, StockcastError::ArtifactNotFound(_)));
    }
}
