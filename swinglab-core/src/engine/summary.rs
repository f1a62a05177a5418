//! Summary scalars derived from a finished ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Ledger, OptionEvent, TradeAction};

/// Headline statistics for one run.
///
/// Signal counts include signals that could not be filled (swing variant);
/// `executed_*` counts only bars where shares actually changed hands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub initial_value: Decimal,
    pub final_value: Decimal,
    /// `(final - initial) / initial × 100`; zero when the initial value is zero.
    pub total_return_pct: Decimal,
    pub cumulative_premium_income: Decimal,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub executed_buys: usize,
    pub executed_sells: usize,
    pub puts_written: usize,
    pub calls_written: usize,
    pub exercise_count: usize,
    pub expired_count: usize,
    pub final_shares: i64,
    pub final_cash: Decimal,
    pub bar_count: usize,
}

impl BacktestSummary {
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let (first, last) = match (ledger.first(), ledger.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Self::default(),
        };

        let mut s = Self {
            initial_value: first.total_asset,
            final_value: last.total_asset,
            total_return_pct: pct_change(first.total_asset, last.total_asset),
            cumulative_premium_income: last.premium_income_cumulative,
            final_shares: last.shares,
            final_cash: last.cash,
            bar_count: ledger.len(),
            ..Self::default()
        };

        for row in ledger.rows() {
            match row.action {
                TradeAction::Buy => {
                    s.buy_signals += 1;
                    if row.shares_traded > 0 {
                        s.executed_buys += 1;
                    }
                }
                TradeAction::Sell => {
                    s.sell_signals += 1;
                    if row.shares_traded < 0 {
                        s.executed_sells += 1;
                    }
                }
                TradeAction::WritePut => s.puts_written += 1,
                TradeAction::WriteCall => s.calls_written += 1,
                TradeAction::Hold => {}
            }
            match row.option_event {
                OptionEvent::Exercised => s.exercise_count += 1,
                OptionEvent::Expired => s.expired_count += 1,
                OptionEvent::Written | OptionEvent::None => {}
            }
        }

        s
    }

    /// Total options written.
    pub fn options_written(&self) -> usize {
        self.puts_written + self.calls_written
    }

    /// Fraction of written options that were exercised, as a percentage.
    pub fn exercise_rate_pct(&self) -> Decimal {
        let written = self.options_written();
        if written == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.exercise_count as u64) / Decimal::from(written as u64)
            * Decimal::ONE_HUNDRED
    }
}

/// Percentage change from `from` to `to`; zero when `from` is zero.
pub fn pct_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    (to - from) / from * Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pct_change_basic() {
        assert_eq!(pct_change(dec!(100), dec!(110)), dec!(10));
        assert_eq!(pct_change(dec!(200), dec!(150)), dec!(-25));
        assert_eq!(pct_change(dec!(0), dec!(150)), dec!(0));
    }

    #[test]
    fn empty_ledger_gives_default() {
        assert_eq!(
            BacktestSummary::from_ledger(&Ledger::default()),
            BacktestSummary::default()
        );
    }

    #[test]
    fn exercise_rate_handles_no_writes() {
        let s = BacktestSummary::default();
        assert_eq!(s.exercise_rate_pct(), Decimal::ZERO);

        let s = BacktestSummary {
            puts_written: 3,
            calls_written: 1,
            exercise_count: 1,
            ..Default::default()
        };
        assert_eq!(s.exercise_rate_pct(), dec!(25));
    }
}
