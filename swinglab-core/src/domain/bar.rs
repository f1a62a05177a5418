//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily closing price for a single symbol.
///
/// Closes are expected to be split/dividend adjusted by the data provider;
/// the engine never adjusts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: Decimal,
}

impl Bar {
    pub fn new(date: NaiveDate, close: Decimal) -> Self {
        Self { date, close }
    }
}
