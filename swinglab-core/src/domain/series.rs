//! Validated daily price series.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::bar::Bar;
use crate::error::EngineError;

/// Ordered, validated sequence of daily bars.
///
/// Construction checks the invariants every engine relies on: at least two
/// bars, strictly increasing dates and strictly positive closes. Month-end
/// flags are precomputed once so both variants see identical expiry days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
    month_end: Vec<bool>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, EngineError> {
        if bars.len() < 2 {
            return Err(EngineError::EmptySeries { len: bars.len() });
        }

        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(EngineError::NonMonotonicDates {
                    index: i + 1,
                    previous: pair[0].date,
                    date: pair[1].date,
                });
            }
        }

        if let Some(bad) = bars.iter().find(|b| b.close <= Decimal::ZERO) {
            return Err(EngineError::NonPositiveClose {
                date: bad.date,
                close: bad.close,
            });
        }

        let month_end = compute_month_ends(&bars);
        Ok(Self { bars, month_end })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false: construction rejects series shorter than two bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_close(&self) -> Decimal {
        self.bars[0].close
    }

    pub fn last_close(&self) -> Decimal {
        self.bars[self.bars.len() - 1].close
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    /// True if bar `i` is the last trading day of its calendar month in this
    /// series. The final bar always counts as a month end.
    pub fn is_month_end(&self, i: usize) -> bool {
        self.month_end.get(i).copied().unwrap_or(false)
    }

    /// Number of month-end bars in the series.
    pub fn month_end_count(&self) -> usize {
        self.month_end.iter().filter(|&&m| m).count()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

fn compute_month_ends(bars: &[Bar]) -> Vec<bool> {
    let mut flags = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let is_end = match bars.get(i + 1) {
            Some(next) => (next.date.year(), next.date.month()) != (bar.date.year(), bar.date.month()),
            None => true,
        };
        flags.push(is_end);
    }
    flags
}
