//! Trade entity and its read projection.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Ticker;

/// One executed transaction parsed from a dump record.
///
/// Storage identity and timestamps are assigned by the store; a trade
/// leaving the parser is always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument symbol.
    pub ticker: Ticker,
    /// Execution time as HHMMSS, sub-second digits dropped.
    pub hour: String,
    /// Session date.
    pub date: NaiveDate,
    /// Execution price.
    pub price: Decimal,
    /// Traded quantity.
    pub quantity: i64,
}

/// Read-only projection of a stored trade used by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInfo {
    /// Instrument symbol.
    pub ticker: Ticker,
    /// Execution price.
    pub price: Decimal,
    /// Session date.
    pub date: NaiveDate,
    /// Traded quantity.
    pub quantity: i64,
}

impl From<&Trade> for TradeInfo {
    fn from(trade: &Trade) -> Self {
        Self {
            ticker: trade.ticker.clone(),
            price: trade.price,
            date: trade.date,
            quantity: trade.quantity,
        }
    }
}
