//! Written option position.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of written option. `None` marks a ledger row with no option activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    #[default]
    None,
    Put,
    Call,
}

impl OptionKind {
    pub fn label(&self) -> &'static str {
        match self {
            OptionKind::None => "",
            OptionKind::Put => "put",
            OptionKind::Call => "call",
        }
    }
}

/// A single open written option. Strike and premium are fixed at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionPosition {
    pub kind: OptionKind,
    pub strike: Decimal,
    pub premium_per_share: Decimal,
    pub opened_on: NaiveDate,
}

impl OptionPosition {
    /// A call is exercised at or above its strike, a put at or below it.
    pub fn is_in_the_money(&self, close: Decimal) -> bool {
        match self.kind {
            OptionKind::Call => close >= self.strike,
            OptionKind::Put => close <= self.strike,
            OptionKind::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(kind: OptionKind, strike: Decimal) -> OptionPosition {
        OptionPosition {
            kind,
            strike,
            premium_per_share: dec!(1),
            opened_on: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        }
    }

    #[test]
    fn call_exercises_at_strike() {
        let call = position(OptionKind::Call, dec!(110));
        assert!(call.is_in_the_money(dec!(110)));
        assert!(call.is_in_the_money(dec!(120)));
        assert!(!call.is_in_the_money(dec!(109.99)));
    }

    #[test]
    fn put_exercises_at_strike() {
        let put = position(OptionKind::Put, dec!(90));
        assert!(put.is_in_the_money(dec!(90)));
        assert!(put.is_in_the_money(dec!(80)));
        assert!(!put.is_in_the_money(dec!(90.01)));
    }

    #[test]
    fn none_kind_never_exercises() {
        assert!(!position(OptionKind::None, dec!(100)).is_in_the_money(dec!(100)));
    }
}
