//! Property tests for the comparison runner.
//!
//! Uses proptest to verify:
//! 1. The parallel comparison equals the two variants run on their own
//! 2. Excess returns are measured against the same baseline
//! 3. `better_variant` and `return_gap_pct` agree with the two returns

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use swinglab_core::{
    run_covered_option, run_swing, Bar, BuyAndHold, PriceSeries, StrategyParams, Variant,
};
use swinglab_runner::run_comparison;

fn arb_series() -> impl Strategy<Value = PriceSeries> {
    prop::collection::vec(500i64..50_000, 2..120).prop_map(|cents| {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
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

proptest! {
    #[test]
    fn comparison_matches_individual_runs(series in arb_series(), params in arb_params()) {
        let result = run_comparison(&series, &params).unwrap();
        prop_assert_eq!(&result.swing, &run_swing(&series, &params).unwrap());
        prop_assert_eq!(&result.covered_option, &run_covered_option(&series, &params).unwrap());
        prop_assert_eq!(&result.baseline, &BuyAndHold::compute(&series, &params));
    }

    #[test]
    fn excess_returns_use_shared_baseline(series in arb_series(), params in arb_params()) {
        let result = run_comparison(&series, &params).unwrap();
        prop_assert_eq!(
            result.swing_excess_pct,
            result.swing.summary.total_return_pct - result.baseline.return_pct
        );
        prop_assert_eq!(
            result.option_excess_pct,
            result.covered_option.summary.total_return_pct - result.baseline.return_pct
        );
    }

    #[test]
    fn better_variant_agrees_with_returns(series in arb_series(), params in arb_params()) {
        let result = run_comparison(&series, &params).unwrap();
        let swing = result.swing.summary.total_return_pct;
        let option = result.covered_option.summary.total_return_pct;
        let expected = if option > swing { Variant::CoveredOption } else { Variant::Swing };
        prop_assert_eq!(result.better_variant(), expected);
        prop_assert_eq!(result.return_gap_pct(), (swing - option).abs());
        prop_assert_eq!(result.run(expected).variant, expected);
    }
}
