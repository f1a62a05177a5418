//! Engine error types.
//!
//! Every variant is a precondition failure raised before the first bar is
//! processed. Once a run has started it cannot fail for business reasons.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the backtest engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("price series needs at least two bars to seed a reference price (got {len})")]
    EmptySeries { len: usize },

    #[error("dates not strictly increasing at bar {index}: {previous} then {date}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("non-positive close {close} on {date}")]
    NonPositiveClose { date: NaiveDate, close: Decimal },
}
