//! In-memory trade store for tests and dry runs.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::application::ports::{RepositoryError, TradeRepositoryPort};
use crate::domain::shared::Ticker;
use crate::domain::trade::{Trade, TradeInfo};

/// In-memory implementation of `TradeRepositoryPort`.
///
/// Rows are kept in insertion order. Inserts can be made to fail or stall to exercise the pipeline's failure
/// and cancellation paths.
#[derive(Debug, Default)]
pub struct InMemoryTradeRepository {
    trades: RwLock<Vec<Trade>>,
    failing_inserts: AtomicUsize,
    insert_delay: Option<Duration>,
}

impl InMemoryTradeRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every bulk insert.
    #[must_use]
    pub fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = Some(delay);
        self
    }

    /// Make the next `count` bulk inserts fail without writing.
    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    /// Number of stored trades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored trade in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Trade> {
        self.trades
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn take_failure(&self) -> bool {
        self.failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TradeRepositoryPort for InMemoryTradeRepository {
    async fn bulk_insert(&self, trades: &[Trade]) -> Result<u64, RepositoryError> {
        if let Some(delay) = self.insert_delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_failure() {
            return Err(RepositoryError::Query("injected insert failure".to_string()));
        }

        let mut stored = self
            .trades
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        stored.extend_from_slice(trades);
        drop(stored);
        Ok(trades.len() as u64)
    }

    async fn list_trade_info(
        &self,
        ticker: &Ticker,
        date: Option<NaiveDate>,
    ) -> Result<Vec<TradeInfo>, RepositoryError> {
        let stored = self
            .trades
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(stored
            .iter()
            .filter(|t| &t.ticker == ticker && date.is_none_or(|d| t.date == d))
            .map(TradeInfo::from)
            .collect())
    }
}
