//! Record parser.
//!
//! Turns one raw dump record (an ordered list of string fields) into a
//! [`Trade`]. Pure: no I/O, no shared state, safe to call from any worker.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::Trade;
use crate::domain::shared::Ticker;

/// Date layout used by the exchange dumps.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Hours longer than this carry sub-second digits that are dropped.
const HOUR_LENGTH: usize = 6;

// ============================================================================
// Raw Record Access
// ============================================================================

/// Positional access to the fields of one raw record.
///
/// Implemented for string slices and vectors here, and for the CSV reader's
/// record type in the file adapter, so the parser never copies fields.
pub trait RawRecord {
    /// Number of fields in the record.
    fn field_count(&self) -> usize;

    /// Field at `index`, if present.
    fn field(&self, index: usize) -> Option<&str>;
}

impl<S: AsRef<str>> RawRecord for [S] {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.get(index).map(AsRef::as_ref)
    }
}

impl<S: AsRef<str>> RawRecord for Vec<S> {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.get(index).map(AsRef::as_ref)
    }
}

// ============================================================================
// Column Layout
// ============================================================================

/// Zero-based column positions of the fields the parser reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Instrument symbol column.
    pub ticker: usize,
    /// Price column (decimal comma allowed).
    pub price: usize,
    /// Quantity column.
    pub quantity: usize,
    /// Execution time column.
    pub hour: usize,
    /// Session date column.
    pub date: usize,
    /// Records with fewer fields are malformed.
    pub min_fields: usize,
}

impl Default for ColumnLayout {
    /// Layout of the B3 intraday trade dump.
    fn default() -> Self {
        Self {
            ticker: 1,
            price: 3,
            quantity: 4,
            hour: 5,
            date: 8,
            min_fields: 10,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a record could not be turned into a trade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Record shape is wrong.
    #[error("malformed record: {0}")]
    MalformedRecord(MalformedReason),

    /// Price field is not a decimal number.
    #[error("invalid price: {value:?}")]
    InvalidPrice {
        /// Raw field value.
        value: String,
    },

    /// Quantity field is not an integer.
    #[error("invalid quantity: {value:?}")]
    InvalidQuantity {
        /// Raw field value.
        value: String,
    },

    /// Date field is not `YYYY-MM-DD`.
    #[error("invalid date: {value:?}")]
    InvalidDate {
        /// Raw field value.
        value: String,
    },
}

/// Detail for [`RecordError::MalformedRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedReason {
    /// Fewer fields than the layout needs.
    #[error("{found} fields, at least {required} required")]
    TooFewFields {
        /// Fields present.
        found: usize,
        /// Fields required by the layout.
        required: usize,
    },

    /// Ticker column is blank.
    #[error("empty ticker")]
    EmptyTicker,
}

// ============================================================================
// Parser
// ============================================================================

/// Parse one raw record into a [`Trade`].
///
/// - price: decimal comma normalized to a point, parsed exactly
/// - quantity: signed integer
/// - hour: truncated to HHMMSS when longer
/// - date: `YYYY-MM-DD`
pub fn parse_record<R>(record: &R, layout: &ColumnLayout) -> Result<Trade, RecordError>
where
    R: RawRecord + ?Sized,
{
    let required = layout.min_fields.max(layout.max_index() + 1);
    let found = record.field_count();
    if found < required {
        return Err(RecordError::MalformedRecord(MalformedReason::TooFewFields {
            found,
            required,
        }));
    }

    let field = |index: usize| record.field(index).unwrap_or_default();

    let ticker = Ticker::parse(field(layout.ticker))
        .map_err(|_| RecordError::MalformedRecord(MalformedReason::EmptyTicker))?;
    let price = parse_price(field(layout.price))?;
    let quantity = parse_quantity(field(layout.quantity))?;
    let hour = truncate_hour(field(layout.hour)).to_string();
    let date = parse_date(field(layout.date))?;

    Ok(Trade {
        ticker,
        hour,
        date,
        price,
        quantity,
    })
}

impl ColumnLayout {
    fn max_index(&self) -> usize {
        self.ticker
            .max(self.price)
            .max(self.quantity)
            .max(self.hour)
            .max(self.date)
    }
}

fn parse_price(raw: &str) -> Result<Decimal, RecordError> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|_| RecordError::InvalidPrice {
        value: raw.to_string(),
    })
}

fn parse_quantity(raw: &str) -> Result<i64, RecordError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| RecordError::InvalidQuantity {
            value: raw.to_string(),
        })
}

fn parse_date(raw: &str) -> Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| RecordError::InvalidDate {
        value: raw.to_string(),
    })
}

fn truncate_hour(raw: &str) -> &str {
    match raw.char_indices().nth(HOUR_LENGTH) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}
