//! Serializable backtest configuration.
//!
//! A config file has two tables:
//!
//! ```toml
//! [backtest]
//! symbol = "AAPL"
//! start_date = "2023-01-01"
//! end_date = "2024-01-01"
//!
//! [strategy]
//! initial_shares = 1000
//! trade_shares = 100
//! threshold = 0.10
//! premium_rate = 0.05
//! initial_cash = 100000.0
//! ```
//!
//! Every `[strategy]` key is optional and falls back to the defaults above.

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use swinglab_core::{StrategyParams, Variant};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration for one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategySection,
}

/// What to test and over which dates (both inclusive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Strategy knobs as written in the file. Fractions are plain floats here
/// and become exact decimals in [`StrategySection::to_params`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySection {
    #[serde(default = "default_initial_shares")]
    pub initial_shares: i64,
    #[serde(default = "default_trade_shares")]
    pub trade_shares: i64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_premium_rate")]
    pub premium_rate: f64,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
}

fn default_initial_shares() -> i64 {
    1000
}
fn default_trade_shares() -> i64 {
    100
}
fn default_threshold() -> f64 {
    0.10
}
fn default_premium_rate() -> f64 {
    0.05
}
fn default_initial_cash() -> f64 {
    100_000.0
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            initial_shares: default_initial_shares(),
            trade_shares: default_trade_shares(),
            threshold: default_threshold(),
            premium_rate: default_premium_rate(),
            initial_cash: default_initial_cash(),
        }
    }
}

impl StrategySection {
    /// Convert to engine parameters. Floats go through their shortest
    /// decimal rendering, so `0.1` becomes exactly `0.1`.
    pub fn to_params(&self) -> Result<StrategyParams, ConfigError> {
        Ok(StrategyParams {
            initial_shares: self.initial_shares,
            trade_shares: self.trade_shares,
            threshold: to_decimal("threshold", self.threshold)?,
            premium_rate: to_decimal("premium_rate", self.premium_rate)?,
            initial_cash: to_decimal("initial_cash", self.initial_cash)?,
        })
    }

    pub fn from_params(params: &StrategyParams) -> Self {
        use rust_decimal::prelude::ToPrimitive;
        Self {
            initial_shares: params.initial_shares,
            trade_shares: params.trade_shares,
            threshold: params.threshold.to_f64().unwrap_or_default(),
            premium_rate: params.premium_rate.to_f64().unwrap_or_default(),
            initial_cash: params.initial_cash.to_f64().unwrap_or_default(),
        }
    }
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal, ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::Invalid(format!("{field} must be finite (got {value})")));
    }
    Decimal::from_str(&value.to_string())
        .map_err(|e| ConfigError::Invalid(format!("{field} = {value}: {e}")))
}

impl BacktestConfig {
    pub fn new(
        symbol: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        strategy: StrategySection,
    ) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                start_date,
                end_date,
            },
            strategy,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Check everything the engine would otherwise reject after loading data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bt = &self.backtest;
        if bt.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if bt.start_date >= bt.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} must be before end_date {}",
                bt.start_date, bt.end_date
            )));
        }
        let params = self.strategy.to_params()?;
        for variant in [Variant::Swing, Variant::CoveredOption] {
            params
                .validate(variant)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    /// Symbol in the canonical upper-case form used for files and caches.
    pub fn symbol(&self) -> String {
        self.backtest.symbol.trim().to_uppercase()
    }

    pub fn params(&self) -> Result<StrategyParams, ConfigError> {
        self.strategy.to_params()
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
