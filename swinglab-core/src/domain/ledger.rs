//! Per-bar ledger rows and the append-only ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::option::OptionKind;

/// What the strategy did on a bar in response to its signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    #[default]
    Hold,
    /// Swing: price fell by the threshold.
    Buy,
    /// Swing: price rose by the threshold.
    Sell,
    /// Option: price fell by the threshold, a covered put was written.
    WritePut,
    /// Option: price rose by the threshold, a covered call was written.
    WriteCall,
}

impl TradeAction {
    pub fn label(&self) -> &'static str {
        match self {
            TradeAction::Hold => "hold",
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::WritePut => "write_put",
            TradeAction::WriteCall => "write_call",
        }
    }
}

/// Option lifecycle event recorded on a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionEvent {
    #[default]
    None,
    Written,
    Exercised,
    Expired,
}

impl OptionEvent {
    pub fn label(&self) -> &'static str {
        match self {
            OptionEvent::None => "",
            OptionEvent::Written => "written",
            OptionEvent::Exercised => "exercised",
            OptionEvent::Expired => "expired",
        }
    }
}

/// One row per bar. Never mutated after it is appended to a [`Ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub close: Decimal,
    /// Reference price in effect after this bar was processed.
    pub reference_price: Decimal,
    pub action: TradeAction,
    pub shares: i64,
    pub cash: Decimal,
    pub total_asset: Decimal,
    pub premium_income_cumulative: Decimal,
    /// Signed share delta applied on this bar (buys and put exercises positive).
    pub shares_traded: i64,
    pub is_exercised: bool,
    pub option_type: OptionKind,
    pub option_event: OptionEvent,
    /// Strike of the option written or resolved on this bar.
    pub strike: Option<Decimal>,
    /// Premium per share of the option written or resolved on this bar.
    pub premium_per_share: Option<Decimal>,
}

impl LedgerRow {
    /// True if the row belongs in the trade log.
    pub fn is_trade(&self) -> bool {
        self.action != TradeAction::Hold || self.is_exercised
    }
}

/// Append-only sequence of [`LedgerRow`]s, one per bar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, row: LedgerRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&LedgerRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }

    /// Rows with a signal-driven action or an exercise.
    pub fn trade_log(&self) -> impl Iterator<Item = &LedgerRow> {
        self.rows.iter().filter(|r| r.is_trade())
    }

    /// Rows on which an option was written, exercised or expired.
    pub fn option_events(&self) -> impl Iterator<Item = &LedgerRow> {
        self.rows
            .iter()
            .filter(|r| r.option_event != OptionEvent::None)
    }

    /// Total asset value at each bar close.
    pub fn equity_curve(&self) -> Vec<Decimal> {
        self.rows.iter().map(|r| r.total_asset).collect()
    }
}
