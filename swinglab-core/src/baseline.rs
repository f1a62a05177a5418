//! Buy-and-hold baseline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{PriceSeries, StrategyParams};

/// Return of holding the initial shares and cash untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyAndHold {
    /// `(last_close / first_close - 1) × 100`.
    pub return_pct: Decimal,
    /// `initial_shares × last_close + initial_cash`.
    pub final_value: Decimal,
}

impl BuyAndHold {
    pub fn compute(series: &PriceSeries, params: &StrategyParams) -> Self {
        let first = series.first_close();
        let last = series.last_close();
        Self {
            return_pct: (last / first - Decimal::ONE) * Decimal::ONE_HUNDRED,
            final_value: Decimal::from(params.initial_shares) * last + params.initial_cash,
        }
    }

    /// Strategy return minus the baseline return, in percentage points.
    pub fn excess_return_pct(&self, strategy_return_pct: Decimal) -> Decimal {
        strategy_return_pct - self.return_pct
    }
}
