//! Trade Repository Port (Driven Port)
//!
//! Interface for bulk-writing trades and reading them back for aggregation.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::shared::Ticker;
use crate::domain::trade::{Trade, TradeInfo};

/// Errors from the trade store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Store could not be reached or opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// Statement failed.
    #[error("query error: {0}")]
    Query(String),

    /// Stored row could not be mapped back into a domain value.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Port for trade persistence.
///
/// Implementations are shared by every persistence worker and the metrics
/// use case, and handle their own locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeRepositoryPort: Send + Sync {
    /// Insert all `trades` as one unit and return the rows written.
    async fn bulk_insert(&self, trades: &[Trade]) -> Result<u64, RepositoryError>;

    /// Trades for `ticker`, restricted to `date` when given.
    async fn list_trade_info(
        &self,
        ticker: &Ticker,
        date: Option<NaiveDate>,
    ) -> Result<Vec<TradeInfo>, RepositoryError>;
}
