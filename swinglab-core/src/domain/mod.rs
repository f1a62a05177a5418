//! Domain types for SwingLab

pub mod bar;
pub mod ledger;
pub mod option;
pub mod params;
pub mod series;

pub use bar::Bar;
pub use ledger::{Ledger, LedgerRow, OptionEvent, TradeAction};
pub use option::{OptionKind, OptionPosition};
pub use params::{StrategyParams, Variant};
pub use series::PriceSeries;
