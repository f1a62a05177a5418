//! Strategy parameters shared by both variants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Which policy a ledger was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Cash/shares rebalancer: buy on a drop, sell on a rise.
    Swing,
    /// Covered option writer: write a put on a drop, a call on a rise.
    CoveredOption,
}

impl Variant {
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Swing => "swing",
            Variant::CoveredOption => "covered_option",
        }
    }
}

/// Immutable configuration for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub initial_shares: i64,
    /// Shares per swing trade and per written option.
    pub trade_shares: i64,
    /// Relative move from the reference price that fires a signal.
    pub threshold: Decimal,
    /// Premium per share as a fraction of the close on the write day.
    pub premium_rate: Decimal,
    pub initial_cash: Decimal,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            initial_shares: 1000,
            trade_shares: 100,
            threshold: Decimal::new(10, 2),
            premium_rate: Decimal::new(5, 2),
            initial_cash: Decimal::new(100_000, 0),
        }
    }
}

/// Upper bound on `initial_shares` and `trade_shares`.
///
/// Keeps share counts and `shares × close` within `i64`/`Decimal` range over
/// any realistic series length.
pub const MAX_SHARES: i64 = 1_000_000_000_000;

/// Upper bound on `initial_cash`.
pub const MAX_CASH: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

impl StrategyParams {
    /// Check the parameters for `variant`. `premium_rate` is only meaningful
    /// (and only checked) for the covered-option variant.
    pub fn validate(&self, variant: Variant) -> Result<(), EngineError> {
        if self.trade_shares <= 0 {
            return Err(invalid(format!(
                "trade_shares must be positive (got {})",
                self.trade_shares
            )));
        }
        if self.trade_shares > MAX_SHARES {
            return Err(invalid(format!(
                "trade_shares must be at most {MAX_SHARES} (got {})",
                self.trade_shares
            )));
        }
        if self.initial_shares < 0 {
            return Err(invalid(format!(
                "initial_shares must be non-negative (got {})",
                self.initial_shares
            )));
        }
        if self.initial_shares > MAX_SHARES {
            return Err(invalid(format!(
                "initial_shares must be at most {MAX_SHARES} (got {})",
                self.initial_shares
            )));
        }
        if self.initial_cash < Decimal::ZERO {
            return Err(invalid(format!(
                "initial_cash must be non-negative (got {})",
                self.initial_cash
            )));
        }
        if self.initial_cash > MAX_CASH {
            return Err(invalid(format!(
                "initial_cash must be at most {MAX_CASH} (got {})",
                self.initial_cash
            )));
        }
        if !in_unit_interval(self.threshold) {
            return Err(invalid(format!(
                "threshold must be in (0, 1) (got {})",
                self.threshold
            )));
        }
        if variant == Variant::CoveredOption && !in_unit_interval(self.premium_rate) {
            return Err(invalid(format!(
                "premium_rate must be in (0, 1) (got {})",
                self.premium_rate
            )));
        }
        Ok(())
    }
}

fn in_unit_interval(value: Decimal) -> bool {
    value > Decimal::ZERO && value < Decimal::ONE
}

fn invalid(msg: String) -> EngineError {
    EngineError::InvalidConfiguration(msg)
}
