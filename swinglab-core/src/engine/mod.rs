//! Backtesting engine: one forward pass per variant over a [`PriceSeries`].
//!
//! Each bar produces exactly one [`LedgerRow`], built from the previous row's
//! shares, cash and cumulative premium plus that bar's signal and lifecycle
//! outcome. Runs are pure: no state survives between calls.

pub mod covered;
pub mod summary;
pub mod swing;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Bar, Ledger, LedgerRow, OptionEvent, OptionKind, PriceSeries, StrategyParams, TradeAction,
    Variant,
};
use crate::error::EngineError;

pub use covered::run_covered_option;
pub use summary::BacktestSummary;
pub use swing::run_swing;

/// Completed run: full ledger plus summary scalars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub variant: Variant,
    pub params: StrategyParams,
    pub ledger: Ledger,
    pub summary: BacktestSummary,
}

/// Run `variant` over `series`.
pub fn run(
    series: &PriceSeries,
    params: &StrategyParams,
    variant: Variant,
) -> Result<BacktestRun, EngineError> {
    match variant {
        Variant::Swing => run_swing(series, params),
        Variant::CoveredOption => run_covered_option(series, params),
    }
}

/// Row 0, seeded straight from the configuration.
pub(crate) fn seed_row(bar: &Bar, params: &StrategyParams) -> LedgerRow {
    LedgerRow {
        date: bar.date,
        close: bar.close,
        reference_price: bar.close,
        action: TradeAction::Hold,
        shares: params.initial_shares,
        cash: params.initial_cash,
        total_asset: mark(params.initial_shares, bar.close, params.initial_cash),
        premium_income_cumulative: Decimal::ZERO,
        shares_traded: 0,
        is_exercised: false,
        option_type: OptionKind::None,
        option_event: OptionEvent::None,
        strike: None,
        premium_per_share: None,
    }
}

/// `shares × close + cash`.
pub(crate) fn mark(shares: i64, close: Decimal, cash: Decimal) -> Decimal {
    Decimal::from(shares) * close + cash
}
