//! Covered option variant: write a put on a threshold drop, a call on a rise.
//!
//! Per bar:
//! 1. Carry forward shares, cash and cumulative premium.
//! 2. If an option is open and the bar is a month end after its write date,
//!    resolve it and reset the reference price to the strike.
//! 3. Otherwise step the generator, suppressed while an option is open; on a
//!    signal write a new option and credit the premium immediately.
//! 4. Mark total asset at the close.
//!
//! A bar that resolves an option never writes a new one; signals resume on
//! the next bar. Premiums and exercises always use `trade_shares` with no
//! affordability check, so shares or cash can go negative. That is logged,
//! not corrected.

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::summary::BacktestSummary;
use super::{mark, seed_row, BacktestRun};
use crate::domain::{
    Ledger, LedgerRow, OptionEvent, OptionKind, PriceSeries, StrategyParams, TradeAction, Variant,
};
use crate::error::EngineError;
use crate::options::Lifecycle;
use crate::signal::SignalState;

/// Run the covered option variant over `series`.
///
/// The final bar always counts as a month end, so a series that stops
/// mid-month settles any option still open on its last bar.
pub fn run_covered_option(
    series: &PriceSeries,
    params: &StrategyParams,
) -> Result<BacktestRun, EngineError> {
    params.validate(Variant::CoveredOption)?;

    let bars = series.bars();
    let trade_shares = Decimal::from(params.trade_shares);
    let mut ledger = Ledger::with_capacity(bars.len());
    let seed = seed_row(&bars[0], params);
    let mut shares = seed.shares;
    let mut cash = seed.cash;
    let mut premium_income = Decimal::ZERO;
    ledger.push(seed);

    let mut state = SignalState::seed(series.first_close());
    let mut lifecycle = Lifecycle::Idle;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let mut action = TradeAction::Hold;
        let mut shares_traded = 0;
        let mut is_exercised = false;
        let mut option_type = OptionKind::None;
        let mut option_event = OptionEvent::None;
        let mut strike = None;
        let mut premium_per_share = None;

        if let Some(res) = lifecycle.resolve(bar.date, bar.close, series.is_month_end(i)) {
            shares_traded = res.share_delta(params.trade_shares);
            shares += shares_traded;
            cash += res.cash_delta(params.trade_shares);
            state = state.reset_to(res.position.strike);

            is_exercised = res.exercised;
            option_type = res.position.kind;
            option_event = if res.exercised {
                OptionEvent::Exercised
            } else {
                OptionEvent::Expired
            };
            strike = Some(res.position.strike);
            premium_per_share = Some(res.position.premium_per_share);

            if res.exercised && (shares < 0 || cash < Decimal::ZERO) {
                warn!(
                    date = %bar.date,
                    kind = res.position.kind.label(),
                    shares,
                    cash = %cash,
                    "exercise left a negative balance; option trades are not clipped"
                );
            }
        } else {
            let (signal, next) = state.step(bar.close, params.threshold, lifecycle.is_open());
            state = next;

            if let Some(pos) =
                lifecycle.write(signal, bar.close, state.reference_price, bar.date, params)
            {
                let premium = pos.premium_per_share * trade_shares;
                cash += premium;
                premium_income += premium;

                action = match pos.kind {
                    OptionKind::Put => TradeAction::WritePut,
                    _ => TradeAction::WriteCall,
                };
                option_type = pos.kind;
                option_event = OptionEvent::Written;
                strike = Some(pos.strike);
                premium_per_share = Some(pos.premium_per_share);
            }
        }

        ledger.push(LedgerRow {
            date: bar.date,
            close: bar.close,
            reference_price: state.reference_price,
            action,
            shares,
            cash,
            total_asset: mark(shares, bar.close, cash),
            premium_income_cumulative: premium_income,
            shares_traded,
            is_exercised,
            option_type,
            option_event,
            strike,
            premium_per_share,
        });
    }

    if let Some(open) = lifecycle.position() {
        warn!(
            opened_on = %open.opened_on,
            kind = open.kind.label(),
            "series ended with an unresolved option"
        );
    }

    let summary = BacktestSummary::from_ledger(&ledger);
    info!(
        variant = Variant::CoveredOption.name(),
        bars = summary.bar_count,
        puts = summary.puts_written,
        calls = summary.calls_written,
        exercised = summary.exercise_count,
        premium = %summary.cumulative_premium_income,
        final_value = %summary.final_value,
        total_return_pct = %summary.total_return_pct.round_dp(2),
        "backtest complete"
    );

    Ok(BacktestRun {
        variant: Variant::CoveredOption,
        params: params.clone(),
        ledger,
        summary,
    })
}
