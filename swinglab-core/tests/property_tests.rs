//! Property tests for ledger invariants.
//!
//! Uses proptest to verify:
//! 1. Accounting identity: total_asset = shares × close + cash on every row
//! 2. Swing balances never go negative
//! 3. Cumulative premium is monotone and grows by trade_shares × close × rate
//! 4. At most one option is open at any time
//! 5. Both runners are pure functions of their inputs

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use swinglab_core::{
    run_covered_option, run_swing, Bar, OptionEvent, PriceSeries, StrategyParams, TradeAction,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_series() -> impl Strategy<Value = PriceSeries> {
    prop::collection::vec(500i64..50_000, 2..150).prop_map(|cents| {
        let start = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let bars = cents
            .into_iter()
            .enumerate()
            .map(|(i, c)| Bar::new(start + chrono::Duration::days(i as i64), Decimal::new(c, 2)))
            .collect();
        PriceSeries::new(bars).unwrap()
    })
}

fn arb_params() -> impl Strategy<Value = StrategyParams> {
    (0i64..2_000, 1i64..500, 1i64..50, 1i64..20, 0i64..500_000).prop_map(
        |(initial_shares, trade_shares, threshold_pct, premium_pct, cash)| StrategyParams {
            initial_shares,
            trade_shares,
            threshold: Decimal::new(threshold_pct, 2),
            premium_rate: Decimal::new(premium_pct, 2),
            initial_cash: Decimal::from(cash),
        },
    )
}

// ── 1. Accounting identity ───────────────────────────────────────────

proptest! {
    #[test]
    fn total_asset_identity_holds(series in arb_series(), params in arb_params()) {
        for run in [
            run_swing(&series, &params).unwrap(),
            run_covered_option(&series, &params).unwrap(),
        ] {
            prop_assert_eq!(run.ledger.len(), series.len());
            for row in run.ledger.rows() {
                prop_assert_eq!(
                    row.total_asset,
                    Decimal::from(row.shares) * row.close + row.cash
                );
            }
        }
    }
}

// ── 2. Swing balances ────────────────────────────────────────────────

proptest! {
    #[test]
    fn swing_never_overdraws(series in arb_series(), params in arb_params()) {
        let run = run_swing(&series, &params).unwrap();
        let mut prev_shares = params.initial_shares;
        for row in run.ledger.rows() {
            prop_assert!(row.shares >= 0);
            prop_assert!(row.cash >= Decimal::ZERO);
            prop_assert!(row.shares_traded.abs() <= params.trade_shares);
            prop_assert_eq!(row.shares, prev_shares + row.shares_traded);
            prop_assert_eq!(row.premium_income_cumulative, Decimal::ZERO);
            prev_shares = row.shares;
        }
    }
}

// ── 3. Premium accrual ───────────────────────────────────────────────

proptest! {
    #[test]
    fn premium_accrues_only_on_writes(series in arb_series(), params in arb_params()) {
        let run = run_covered_option(&series, &params).unwrap();
        let mut prev = Decimal::ZERO;
        for row in run.ledger.rows() {
            let increment = row.premium_income_cumulative - prev;
            if row.option_event == OptionEvent::Written {
                prop_assert_eq!(
                    increment,
                    Decimal::from(params.trade_shares) * row.close * params.premium_rate
                );
            } else {
                prop_assert_eq!(increment, Decimal::ZERO);
            }
            prev = row.premium_income_cumulative;
        }
        prop_assert_eq!(run.summary.cumulative_premium_income, prev);
    }
}

// ── 4. Single open option ────────────────────────────────────────────

proptest! {
    #[test]
    fn at_most_one_open_option(series in arb_series(), params in arb_params()) {
        let run = run_covered_option(&series, &params).unwrap();
        let mut open = false;
        for (i, row) in run.ledger.rows().iter().enumerate() {
            match row.option_event {
                OptionEvent::Written => {
                    prop_assert!(!open, "write while open at bar {}", i);
                    open = true;
                }
                OptionEvent::Exercised | OptionEvent::Expired => {
                    prop_assert!(open, "resolution with nothing open at bar {}", i);
                    prop_assert!(series.is_month_end(i));
                    prop_assert_eq!(row.action, TradeAction::Hold);
                    open = false;
                }
                OptionEvent::None => {}
            }
        }
    }
}

// ── 5. Purity ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn runs_are_repeatable(series in arb_series(), params in arb_params()) {
        prop_assert_eq!(run_swing(&series, &params).unwrap(), run_swing(&series, &params).unwrap());
        prop_assert_eq!(
            run_covered_option(&series, &params).unwrap(),
            run_covered_option(&series, &params).unwrap()
        );
    }
}
