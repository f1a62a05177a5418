//! Comparison runner: both variants plus the baseline over one series.
//!
//! Two entry points:
//! - `run_comparison()`: takes a loaded series. No I/O.
//! - `run_from_config()`: loads the series through the cache/provider
//!   fallback, then runs. Used by the CLI.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use swinglab_core::data::{BarCache, DataProvider, DataSource};
use swinglab_core::{
    run_covered_option, run_swing, BacktestRun, BuyAndHold, EngineError, PriceSeries,
    StrategyParams, Variant,
};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedSeries};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Provenance of the series a comparison ran on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProvenance {
    pub symbol: String,
    pub source: DataSource,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub bar_count: usize,
}

impl DataProvenance {
    pub fn from_loaded(loaded: &LoadedSeries) -> Self {
        Self {
            symbol: loaded.symbol.clone(),
            source: loaded.source,
            dataset_hash: loaded.dataset_hash.clone(),
            has_synthetic: loaded.has_synthetic,
            first_date: loaded.series.first_date(),
            last_date: loaded.series.last_date(),
            bar_count: loaded.series.len(),
        }
    }
}

/// Swing vs covered option vs buy-and-hold over the same series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Set when the run came from a config file.
    pub run_id: Option<String>,
    pub provenance: Option<DataProvenance>,
    pub params: StrategyParams,
    pub swing: BacktestRun,
    pub covered_option: BacktestRun,
    pub baseline: BuyAndHold,
    /// Swing return minus baseline return, in percentage points.
    pub swing_excess_pct: Decimal,
    /// Option return minus baseline return, in percentage points.
    pub option_excess_pct: Decimal,
}

impl ComparisonResult {
    /// The variant with the higher total return; swing wins a tie.
    pub fn better_variant(&self) -> Variant {
        if self.covered_option.summary.total_return_pct > self.swing.summary.total_return_pct {
            Variant::CoveredOption
        } else {
            Variant::Swing
        }
    }

    /// Absolute return gap between the two variants, in percentage points.
    pub fn return_gap_pct(&self) -> Decimal {
        (self.swing.summary.total_return_pct - self.covered_option.summary.total_return_pct).abs()
    }

    pub fn run(&self, variant: Variant) -> &BacktestRun {
        match variant {
            Variant::Swing => &self.swing,
            Variant::CoveredOption => &self.covered_option,
        }
    }
}

/// Run both variants over the same immutable series.
///
/// The two runners share nothing but `series` and `params`, so they run in
/// parallel on the rayon pool.
pub fn run_comparison(
    series: &PriceSeries,
    params: &StrategyParams,
) -> Result<ComparisonResult, RunError> {
    let (swing, option) = rayon::join(
        || run_swing(series, params),
        || run_covered_option(series, params),
    );
    let (swing, covered_option) = (swing?, option?);

    let baseline = BuyAndHold::compute(series, params);
    let result = ComparisonResult {
        schema_version: SCHEMA_VERSION,
        run_id: None,
        provenance: None,
        params: params.clone(),
        swing_excess_pct: baseline.excess_return_pct(swing.summary.total_return_pct),
        option_excess_pct: baseline.excess_return_pct(covered_option.summary.total_return_pct),
        swing,
        covered_option,
        baseline,
    };

    info!(
        swing_return_pct = %result.swing.summary.total_return_pct.round_dp(2),
        option_return_pct = %result.covered_option.summary.total_return_pct.round_dp(2),
        baseline_return_pct = %result.baseline.return_pct.round_dp(2),
        better = result.better_variant().name(),
        "comparison complete"
    );
    Ok(result)
}

/// Load the configured series and run the comparison.
///
/// `opts` supplies the offline/synthetic/force flags; its dates are replaced
/// by the config's.
pub fn run_from_config(
    config: &BacktestConfig,
    cache: &BarCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<ComparisonResult, RunError> {
    config.validate()?;
    let params = config.params()?;
    let opts = LoadOptions {
        start: config.backtest.start_date,
        end: config.backtest.end_date,
        ..opts.clone()
    };

    let loaded = load_series(&config.symbol(), cache, provider, &opts)?;
    let mut result = run_comparison(&loaded.series, &params)?;
    result.run_id = Some(config.run_id()?);
    result.provenance = Some(DataProvenance::from_loaded(&loaded));
    Ok(result)
}
