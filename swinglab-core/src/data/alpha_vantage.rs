//! Alpha Vantage daily price provider.
//!
//! Calls `TIME_SERIES_DAILY` with a full output size and keeps the
//! `4. close` field of every day inside the requested range. Alpha Vantage
//! reports most failures as HTTP 200 with an explanatory body, so the body is
//! inspected before the series is.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{clip_to_range, DataError, DataProvider, DataSource, FetchResult};
use crate::domain::Bar;

pub const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Free-tier quota window; used when the body signals a rate limit.
const RATE_LIMIT_BACKOFF_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<NaiveDate, DailyEntry>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "4. close")]
    close: Decimal,
}

/// Alpha Vantage provider.
pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl AlphaVantageProvider {
    pub fn new(
        api_key: impl Into<String>,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::Transient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Point at a different endpoint (a local mock server, a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Turn a decoded body into bars inside `[start, end]`.
    fn parse_response(
        symbol: &str,
        resp: DailyResponse,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        if let Some(msg) = resp.error_message {
            debug!(symbol, message = %msg, "alpha vantage rejected symbol");
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        if let Some(msg) = resp.note.or(resp.information) {
            warn!(symbol, message = %msg, "alpha vantage quota message");
            return Err(DataError::RateLimited {
                retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
            });
        }

        let series = resp.series.ok_or_else(|| {
            DataError::ResponseFormatChanged("missing 'Time Series (Daily)' object".into())
        })?;

        // BTreeMap keys are already ascending.
        let bars = series
            .into_iter()
            .map(|(date, entry)| Bar::new(date, entry.close))
            .collect();
        clip_to_range(symbol, bars, start, end)
    }

    /// Execute the request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, ?delay, "retrying alpha vantage request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let request = self.client.get(&self.base_url).query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("apikey", self.api_key.as_str()),
            ]);

            match request.send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Transient(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let body: DailyResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    match Self::parse_response(symbol, body, start, end) {
                        Ok(bars) => {
                            self.circuit_breaker.record_success();
                            return Ok(bars);
                        }
                        Err(e @ DataError::RateLimited { .. }) => {
                            // A quota note is not worth a fast retry.
                            self.circuit_breaker.record_failure();
                            return Err(e);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::Transient(e.to_string()));
                        continue;
                    }
                    return Err(DataError::Transient(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Transient("max retries exceeded".into())))
    }
}

impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let bars = self.fetch_with_retry(symbol, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::AlphaVantage,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
