//! Covered option lifecycle: `Idle → Written → Idle`.
//!
//! At most one option is open at a time. A position is written on the bar a
//! signal fires and is only checked for exercise on a month-end bar strictly
//! after the bar it was written on. Resolution always returns the machine to
//! `Idle`; the caller resets the reference price to the strike.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{OptionKind, OptionPosition, StrategyParams};
use crate::signal::Signal;

/// Lifecycle state. `Written` owns the single open position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Idle,
    Written(OptionPosition),
}

/// Outcome of resolving an open position on a month-end bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub position: OptionPosition,
    pub exercised: bool,
}

impl Resolution {
    /// Signed share delta for `trade_shares`: a put assigns shares, a call
    /// calls them away. Zero when the option expired worthless.
    pub fn share_delta(&self, trade_shares: i64) -> i64 {
        if !self.exercised {
            return 0;
        }
        match self.position.kind {
            OptionKind::Put => trade_shares,
            OptionKind::Call => -trade_shares,
            OptionKind::None => 0,
        }
    }

    /// Signed cash delta: shares change hands at the strike.
    pub fn cash_delta(&self, trade_shares: i64) -> Decimal {
        -Decimal::from(self.share_delta(trade_shares)) * self.position.strike
    }
}

impl Lifecycle {
    pub fn is_open(&self) -> bool {
        matches!(self, Lifecycle::Written(_))
    }

    pub fn position(&self) -> Option<&OptionPosition> {
        match self {
            Lifecycle::Idle => None,
            Lifecycle::Written(pos) => Some(pos),
        }
    }

    /// `Idle → Written` on a `Down` (put) or `Up` (call) signal.
    ///
    /// `reference_price` is the reference in effect after the signal fired.
    /// Returns `None`, leaving the state unchanged, when a position is already
    /// open or the signal is `None`.
    pub fn write(
        &mut self,
        signal: Signal,
        close: Decimal,
        reference_price: Decimal,
        date: NaiveDate,
        params: &StrategyParams,
    ) -> Option<OptionPosition> {
        if self.is_open() {
            return None;
        }

        let (kind, strike) = match signal {
            Signal::Down => (OptionKind::Put, reference_price * (Decimal::ONE - params.threshold)),
            Signal::Up => (OptionKind::Call, reference_price * (Decimal::ONE + params.threshold)),
            Signal::None => return None,
        };

        let position = OptionPosition {
            kind,
            strike,
            premium_per_share: close * params.premium_rate,
            opened_on: date,
        };
        debug!(%date, kind = kind.label(), %strike, premium = %position.premium_per_share, "option written");
        *self = Lifecycle::Written(position);
        Some(position)
    }

    /// `Written → Idle` on a month-end bar after the open date.
    ///
    /// No-op (returns `None`) when idle, when the bar is not a month end, or
    /// when the position was opened on this very bar.
    pub fn resolve(
        &mut self,
        date: NaiveDate,
        close: Decimal,
        is_month_end: bool,
    ) -> Option<Resolution> {
        let position = match self {
            Lifecycle::Written(pos) => *pos,
            Lifecycle::Idle => return None,
        };
        if !is_month_end || date <= position.opened_on {
            return None;
        }

        let exercised = position.is_in_the_money(close);
        debug!(
            %date,
            kind = position.kind.label(),
            strike = %position.strike,
            %close,
            exercised,
            "option resolved"
        );
        *self = Lifecycle::Idle;
        Some(Resolution {
            position,
            exercised,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn params() -> StrategyParams {
        StrategyParams {
            threshold: dec!(0.10),
            premium_rate: dec!(0.05),
            trade_shares: 100,
            ..Default::default()
        }
    }

    #[test]
    fn up_signal_writes_call_above_reference() {
        let mut lc = Lifecycle::Idle;
        let pos = lc
            .write(Signal::Up, dec!(111), dec!(111), d(1, 3), &params())
            .unwrap();
        assert_eq!(pos.kind, OptionKind::Call);
        assert_eq!(pos.strike, dec!(122.1));
        assert_eq!(pos.premium_per_share, dec!(5.55));
        assert!(lc.is_open());
    }

    #[test]
    fn down_signal_writes_put_below_reference() {
        let mut lc = Lifecycle::Idle;
        let pos = lc
            .write(Signal::Down, dec!(90), dec!(90), d(1, 3), &params())
            .unwrap();
        assert_eq!(pos.kind, OptionKind::Put);
        assert_eq!(pos.strike, dec!(81));
        assert_eq!(pos.premium_per_share, dec!(4.5));
    }

    #[test]
    fn cannot_write_while_open_or_without_signal() {
        let mut lc = Lifecycle::Idle;
        assert!(lc.write(Signal::None, dec!(100), dec!(100), d(1, 2), &params()).is_none());
        assert_eq!(lc, Lifecycle::Idle);

        let first = lc.write(Signal::Up, dec!(110), dec!(110), d(1, 2), &params());
        assert!(first.is_some());
        assert!(lc.write(Signal::Down, dec!(90), dec!(90), d(1, 3), &params()).is_none());
        assert_eq!(lc.position(), first.as_ref());
    }

    #[test]
    fn resolve_is_noop_when_idle() {
        let mut lc = Lifecycle::Idle;
        assert!(lc.resolve(d(1, 31), dec!(100), true).is_none());
    }

    #[test]
    fn resolve_waits_for_month_end() {
        let mut lc = Lifecycle::Idle;
        lc.write(Signal::Up, dec!(110), dec!(110), d(1, 10), &params());
        assert!(lc.resolve(d(1, 11), dec!(200), false).is_none());
        assert!(lc.is_open());
    }

    #[test]
    fn resolve_skips_the_write_day() {
        let mut lc = Lifecycle::Idle;
        lc.write(Signal::Up, dec!(110), dec!(110), d(1, 31), &params());
        assert!(lc.resolve(d(1, 31), dec!(200), true).is_none());
        assert!(lc.is_open());

        let res = lc.resolve(d(2, 29), dec!(200), true).unwrap();
        assert!(res.exercised);
        assert!(!lc.is_open());
    }

    #[test]
    fn exercised_call_sells_at_strike() {
        let mut lc = Lifecycle::Idle;
        lc.write(Signal::Up, dec!(100), dec!(100), d(1, 2), &params());
        let res = lc.resolve(d(1, 31), dec!(110), true).unwrap();
        assert!(res.exercised);
        assert_eq!(res.share_delta(100), -100);
        assert_eq!(res.cash_delta(100), dec!(11000));
    }

    #[test]
    fn exercised_put_buys_at_strike() {
        let mut lc = Lifecycle::Idle;
        lc.write(Signal::Down, dec!(100), dec!(100), d(1, 2), &params());
        let res = lc.resolve(d(1, 31), dec!(85), true).unwrap();
        assert!(res.exercised);
        assert_eq!(res.share_delta(100), 100);
        assert_eq!(res.cash_delta(100), dec!(-9000));
    }

    #[test]
    fn out_of_the_money_expires_worthless() {
        let mut lc = Lifecycle::Idle;
        lc.write(Signal::Up, dec!(100), dec!(100), d(1, 2), &params());
        let res = lc.resolve(d(1, 31), dec!(105), true).unwrap();
        assert!(!res.exercised);
        assert_eq!(res.share_delta(100), 0);
        assert_eq!(res.cash_delta(100), Decimal::ZERO);
        assert_eq!(lc, Lifecycle::Idle);
    }
}
