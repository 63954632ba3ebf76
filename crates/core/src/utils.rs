//! Shared utility functions used across multiple crates.

use chrono::{NaiveDate, NaiveDateTime};

// ── Date Parsing ────────────────────────────────────────────────────

/// Parse a date string in `YYYY-MM-DD` format.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse a timestamp as written by common market data exports.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, and the same with a trailing
/// UTC offset (`2024-01-02 00:00:00+00:00`). The offset is dropped.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Some(d) = parse_date(s) {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    chrono::DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.naive_local())
        .ok()
}

/// Uppercase and trim a ticker symbol.
pub fn normalize_ticker(s: &str) -> String {
    s.trim().to_uppercase()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-01-15").is_some());
        assert!(parse_date("bad").is_none());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = parse_date("2024-01-02").unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-02"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl "), "AAPL");
        assert_eq!(normalize_ticker("bbca.jk"), "BBCA.JK");
    }
}
