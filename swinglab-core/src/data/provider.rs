//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Alpha Vantage, CSV
//! files) so the runner can swap implementations and mock them in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    NotFound { symbol: String },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("provider returned no bars for '{symbol}' between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid close '{value}' on {date}")]
    InvalidClose { date: NaiveDate, value: String },

    #[error("cache error: {0}")]
    Cache(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Whether a later retry of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::RateLimited { .. } | DataError::Transient(_)
        )
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    /// Ascending by date, never empty.
    pub bars: Vec<Bar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    AlphaVantage,
    CsvImport,
    Cache,
    Synthetic,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::AlphaVantage => "alpha_vantage",
            DataSource::CsvImport => "csv_import",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// Trait for price series providers.
///
/// The cache layer sits above this trait; providers don't know about the cache.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily closes for `symbol` within `[start, end]`.
    ///
    /// An empty result is reported as [`DataError::NoData`], never as an
    /// empty `FetchResult`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

/// Keep bars inside `[start, end]`, failing with `NoData` if none remain.
pub fn clip_to_range(
    symbol: &str,
    bars: Vec<Bar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>, DataError> {
    let bars: Vec<Bar> = bars
        .into_iter()
        .filter(|b| b.date >= start && b.date <= end)
        .collect();
    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn clip_keeps_inclusive_range() {
        let bars = (2..=6).map(|day| Bar::new(d(day), dec!(10))).collect();
        let clipped = clip_to_range("SPY", bars, d(3), d(5)).unwrap();
        assert_eq!(clipped.len(), 3);
        assert_eq!(clipped[0].date, d(3));
        assert_eq!(clipped[2].date, d(5));
    }

    #[test]
    fn clip_to_empty_is_no_data() {
        let bars = vec![Bar::new(d(2), dec!(10))];
        let err = clip_to_range("SPY", bars, d(10), d(20)).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn retryable_kinds() {
        assert!(DataError::RateLimited { retry_after_secs: 1 }.is_retryable());
        assert!(DataError::Transient("timeout".into()).is_retryable());
        assert!(!DataError::NotFound { symbol: "X".into() }.is_retryable());
    }
}
