//! Swing variant: buy `trade_shares` on a threshold drop, sell on a rise.
//!
//! Fills are clipped to what the account can afford. A buy that cannot be
//! paid in full buys the largest whole-share quantity the cash covers; a sell
//! larger than the holding sells the holding. Shares and cash never go
//! negative.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::summary::BacktestSummary;
use super::{mark, seed_row, BacktestRun};
use crate::domain::{
    Ledger, LedgerRow, OptionEvent, OptionKind, PriceSeries, StrategyParams, TradeAction, Variant,
};
use crate::error::EngineError;
use crate::signal::{Signal, SignalState};

/// Run the swing variant over `series`.
pub fn run_swing(series: &PriceSeries, params: &StrategyParams) -> Result<BacktestRun, EngineError> {
    params.validate(Variant::Swing)?;

    let bars = series.bars();
    let mut ledger = Ledger::with_capacity(bars.len());
    let seed = seed_row(&bars[0], params);
    let mut shares = seed.shares;
    let mut cash = seed.cash;
    ledger.push(seed);

    let mut state = SignalState::seed(series.first_close());

    for bar in &bars[1..] {
        let (signal, next) = state.step(bar.close, params.threshold, false);
        state = next;

        let (action, delta) = match signal {
            Signal::Down => (
                TradeAction::Buy,
                buy_quantity(cash, bar.close, params.trade_shares),
            ),
            Signal::Up => (
                TradeAction::Sell,
                -sell_quantity(shares, params.trade_shares),
            ),
            Signal::None => (TradeAction::Hold, 0),
        };

        if signal.fired() {
            debug!(
                date = %bar.date,
                close = %bar.close,
                action = action.label(),
                requested = params.trade_shares,
                filled = delta.abs(),
                "swing signal"
            );
        }

        shares += delta;
        cash -= Decimal::from(delta) * bar.close;

        ledger.push(LedgerRow {
            date: bar.date,
            close: bar.close,
            reference_price: state.reference_price,
            action,
            shares,
            cash,
            total_asset: mark(shares, bar.close, cash),
            premium_income_cumulative: Decimal::ZERO,
            shares_traded: delta,
            is_exercised: false,
            option_type: OptionKind::None,
            option_event: OptionEvent::None,
            strike: None,
            premium_per_share: None,
        });
    }

    let summary = BacktestSummary::from_ledger(&ledger);
    info!(
        variant = Variant::Swing.name(),
        bars = summary.bar_count,
        buys = summary.executed_buys,
        sells = summary.executed_sells,
        final_value = %summary.final_value,
        total_return_pct = %summary.total_return_pct.round_dp(2),
        "backtest complete"
    );

    Ok(BacktestRun {
        variant: Variant::Swing,
        params: params.clone(),
        ledger,
        summary,
    })
}

/// Shares bought for a buy signal: `trade_shares` if affordable, otherwise
/// the largest affordable whole-share quantity (possibly zero).
pub fn buy_quantity(cash: Decimal, close: Decimal, trade_shares: i64) -> i64 {
    if cash >= Decimal::from(trade_shares) * close {
        return trade_shares;
    }
    let mut qty = (cash / close).floor().to_i64().unwrap_or(0).clamp(0, trade_shares);
    // Division rounds at 28 digits; step back if the rounded quantity overdraws.
    while qty > 0 && Decimal::from(qty) * close > cash {
        qty -= 1;
    }
    qty
}

/// Shares sold for a sell signal: `trade_shares` if held, otherwise the
/// whole holding (possibly zero).
pub fn sell_quantity(shares: i64, trade_shares: i64) -> i64 {
    trade_shares.min(shares.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn series(closes: &[Decimal]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar::new(start + chrono::Duration::days(i as i64), c))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn buy_quantity_full_fill() {
        assert_eq!(buy_quantity(dec!(10000), dec!(100), 100), 100);
    }

    #[test]
    fn buy_quantity_partial_fill() {
        assert_eq!(buy_quantity(dec!(950), dec!(100), 100), 9);
        assert_eq!(buy_quantity(dec!(99.99), dec!(100), 100), 0);
        assert_eq!(buy_quantity(dec!(0), dec!(100), 100), 0);
    }

    #[test]
    fn sell_quantity_clips_to_holding() {
        assert_eq!(sell_quantity(1000, 100), 100);
        assert_eq!(sell_quantity(40, 100), 40);
        assert_eq!(sell_quantity(0, 100), 0);
    }

    #[test]
    fn seed_row_uses_configuration() {
        let params = StrategyParams::default();
        let run = run_swing(&series(&[dec!(50), dec!(51)]), &params).unwrap();
        let first = run.ledger.first().unwrap();
        assert_eq!(first.shares, 1000);
        assert_eq!(first.cash, dec!(100000));
        assert_eq!(first.total_asset, dec!(150000));
        assert_eq!(first.action, TradeAction::Hold);
    }

    #[test]
    fn sell_with_no_shares_records_signal_without_trade() {
        let params = StrategyParams {
            initial_shares: 0,
            ..Default::default()
        };
        let run = run_swing(&series(&[dec!(100), dec!(120)]), &params).unwrap();
        let row = &run.ledger.rows()[1];
        assert_eq!(row.action, TradeAction::Sell);
        assert_eq!(row.shares_traded, 0);
        assert_eq!(row.shares, 0);
        assert_eq!(row.cash, dec!(100000));
    }

    #[test]
    fn buy_with_little_cash_buys_what_it_can() {
        let params = StrategyParams {
            initial_cash: dec!(250),
            ..Default::default()
        };
        let run = run_swing(&series(&[dec!(100), dec!(80)]), &params).unwrap();
        let row = &run.ledger.rows()[1];
        assert_eq!(row.action, TradeAction::Buy);
        assert_eq!(row.shares_traded, 3);
        assert_eq!(row.shares, 1003);
        assert_eq!(row.cash, dec!(10));
    }

    #[test]
    fn rejects_invalid_params_before_processing() {
        let params = StrategyParams {
            threshold: dec!(1),
            ..Default::default()
        };
        assert!(matches!(
            run_swing(&series(&[dec!(1), dec!(2)]), &params),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }
}
