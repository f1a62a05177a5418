//! Reference-price threshold signal generator.
//!
//! The generator is a pure fold: [`SignalState`] carries the reference price
//! from one bar to the next and [`SignalState::step`] returns the signal for
//! the bar together with the next state. Nothing else is carried, so running
//! the fold twice over the same closes yields the same signals.
//!
//! A move of exactly `threshold` fires. While `suppressed` is set (an option
//! is open) the reference price is frozen and nothing fires.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;

/// Direction of a threshold crossing relative to the reference price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    None,
    /// Price fell by at least the threshold.
    Down,
    /// Price rose by at least the threshold.
    Up,
}

impl Signal {
    pub fn fired(&self) -> bool {
        *self != Signal::None
    }
}

/// Fold accumulator for the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub reference_price: Decimal,
}

impl SignalState {
    /// Seed from the first close of a series.
    pub fn seed(first_close: Decimal) -> Self {
        Self {
            reference_price: first_close,
        }
    }

    /// Evaluate one bar. The reference price moves to `close` whenever a
    /// signal fires.
    ///
    /// `reference_price` must be positive; [`PriceSeries`] guarantees this
    /// for closes, and strikes derived from them inherit it.
    pub fn step(self, close: Decimal, threshold: Decimal, suppressed: bool) -> (Signal, Self) {
        if suppressed {
            return (Signal::None, self);
        }

        let change = (close - self.reference_price) / self.reference_price;
        if change <= -threshold {
            (Signal::Down, Self::seed(close))
        } else if change >= threshold {
            (Signal::Up, Self::seed(close))
        } else {
            (Signal::None, self)
        }
    }

    /// Move the reference price after an option resolves.
    pub fn reset_to(self, price: Decimal) -> Self {
        Self::seed(price)
    }
}

/// Signal and reference price for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub signal: Signal,
    pub reference_price: Decimal,
}

/// Run the unsuppressed generator over a whole series.
///
/// Returns one point per bar after the first.
pub fn generate_signals(series: &PriceSeries, threshold: Decimal) -> Vec<SignalPoint> {
    let mut state = SignalState::seed(series.first_close());
    series.bars()[1..]
        .iter()
        .map(|bar| {
            let (signal, next) = state.step(bar.close, threshold, false);
            state = next;
            SignalPoint {
                signal,
                reference_price: next.reference_price,
            }
        })
        .collect()
}
