//! Trade Bounded Context
//!
//! The trade entity as it flows through the pipeline, the batch it is
//! persisted in, the read projection used for aggregation, and the parser
//! turning raw dump records into trades.

mod batch;
mod entity;
mod record;

pub use batch::Batch;
pub use entity::{Trade, TradeInfo};
pub use record::{ColumnLayout, MalformedReason, RawRecord, RecordError, parse_record};
