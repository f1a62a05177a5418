//! SwingLab Core: domain types, signal generator, option lifecycle, and the
//! two ledger runners.
//!
//! This crate contains the backtest itself:
//! - Validated price series with month-end flags
//! - Reference-price threshold signal generator
//! - Covered option lifecycle (write, resolve at month end)
//! - Swing and covered option runners producing full ledgers
//! - Buy-and-hold baseline
//! - Price providers and the on-disk cache

pub mod baseline;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod options;
pub mod signal;

pub use baseline::BuyAndHold;
pub use domain::{
    Bar, Ledger, LedgerRow, OptionEvent, OptionKind, OptionPosition, PriceSeries, StrategyParams,
    TradeAction, Variant,
};
pub use engine::{run, run_covered_option, run_swing, BacktestRun, BacktestSummary};
pub use error::EngineError;
pub use signal::{generate_signals, Signal, SignalState};
