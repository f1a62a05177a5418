//! Price series loading and data resolution for the runner.
//!
//! Implements the fallback policy for one symbol:
//! 1. If a fresh cache entry exists → use it
//! 2. If not cached and provider available → download and cache
//! 3. If no data and `synthetic` → generate a synthetic series (tagged)
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only debug mode. Results produced on it are
//! tagged in every artifact.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use swinglab_core::data::{BarCache, CacheMeta, DataError, DataProvider, DataSource};
use swinglab_core::{Bar, EngineError, PriceSeries};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("unusable price series: {0}")]
    Series(#[from] EngineError),
}

/// Options controlling how a series is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start date for bars (inclusive).
    pub start: NaiveDate,
    /// End date for bars (inclusive).
    pub end: NaiveDate,
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, generate a synthetic series when real data is unavailable.
    pub synthetic: bool,
    /// Force re-download even if cached.
    pub force: bool,
}

impl LoadOptions {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            offline: false,
            synthetic: false,
            force: false,
        }
    }
}

/// A validated series plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub series: PriceSeries,
    pub source: DataSource,
    /// BLAKE3 over the symbol and every bar.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load the series for `symbol` from the cache, with fallback to download or synthetic.
///
/// This is the primary entry point for the runner to get bar data.
pub fn load_series(
    symbol: &str,
    cache: &BarCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let (bars, source) = resolve_bars(symbol, cache, provider, opts)?;
    let series = PriceSeries::new(bars)?;
    let dataset_hash = compute_dataset_hash(symbol, series.bars());
    info!(
        symbol,
        source = source.label(),
        bars = series.len(),
        first = %series.first_date(),
        last = %series.last_date(),
        "price series loaded"
    );
    Ok(LoadedSeries {
        symbol: symbol.to_string(),
        has_synthetic: source == DataSource::Synthetic,
        series,
        source,
        dataset_hash,
    })
}

fn resolve_bars(
    symbol: &str,
    cache: &BarCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<(Vec<Bar>, DataSource), LoadError> {
    // Step 1: Try cache
    if !opts.force {
        match cache.load(symbol, opts.start, opts.end) {
            Ok(Some(bars)) => {
                debug!(symbol, bars = bars.len(), "cache hit");
                return Ok((bars, DataSource::Cache));
            }
            Ok(None) => debug!(symbol, "cache miss"),
            Err(e) => warn!(symbol, error = %e, "cache read failed; falling back to provider"),
        }
    }

    // Step 2: Try download (if not offline and provider available)
    let mut failure = None;
    if !opts.offline {
        match provider {
            Some(prov) if prov.is_available() => match prov.fetch(symbol, opts.start, opts.end) {
                Ok(fetched) => {
                    // Unusable bars must never become a cache hit.
                    PriceSeries::new(fetched.bars.clone())?;
                    cache.write(symbol, opts.start, opts.end, &fetched.bars, fetched.source)?;
                    return Ok((fetched.bars, fetched.source));
                }
                Err(e) => {
                    warn!(symbol, provider = prov.name(), error = %e, "download failed");
                    failure = Some(e.to_string());
                }
            },
            Some(prov) => failure = Some(format!("provider '{}' is unavailable", prov.name())),
            None => failure = Some("no provider configured".into()),
        }
    }

    // Step 3: Synthetic fallback (if enabled)
    if opts.synthetic {
        warn!(symbol, "generating synthetic data; results will be tagged as synthetic");
        return Ok((
            generate_synthetic_bars(symbol, opts.start, opts.end),
            DataSource::Synthetic,
        ));
    }

    // Step 4: Fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::DownloadFailed {
        symbol: symbol.to_string(),
        reason: failure.unwrap_or_else(|| "data not cached and download failed".into()),
    })
}

/// Fetch `symbol` from the provider and store it, bypassing any cached copy.
pub fn download_series(
    symbol: &str,
    cache: &BarCache,
    provider: &dyn DataProvider,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CacheMeta, LoadError> {
    let fetched = provider.fetch(symbol, start, end)?;
    // Reject unusable data before it reaches the cache.
    PriceSeries::new(fetched.bars.clone())?;
    Ok(cache.write(symbol, start, end, &fetched.bars, fetched.source)?)
}

/// Compute a deterministic BLAKE3 hash over the symbol and all bar data.
fn compute_dataset_hash(symbol: &str, bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.to_uppercase().as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(bar.close.normalize().to_string().as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate a synthetic series for testing/development.
///
/// A weekday-only random walk in whole cents from 100.00, seeded from the
/// symbol name so the same symbol always gets the same path.
fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.to_uppercase().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut cents: i64 = 10_000;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            cents = ((cents as f64) * (1.0 + daily_return)).round().max(1.0) as i64;
            bars.push(Bar::new(current, Decimal::new(cents, 2)));
        }
        current += chrono::Duration::days(1);
    }

    bars
}
