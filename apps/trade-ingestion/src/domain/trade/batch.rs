//! Batch of trades committed to the store as one unit.

use super::Trade;

/// An ordered, non-empty group of trades destined for one bulk insert.
///
/// The only constructor refuses empty input, so a `Batch` in hand always
/// has at least one trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch(Vec<Trade>);

impl Batch {
    /// Wrap `trades` into a batch; `None` when there is nothing to write.
    #[must_use]
    pub fn new(trades: Vec<Trade>) -> Option<Self> {
        if trades.is_empty() {
            None
        } else {
            Some(Self(trades))
        }
    }

    /// Number of trades in the batch. Always at least one.
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrow the trades in insertion order.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.0
    }

    /// Take the trades out of the batch.
    #[must_use]
    pub fn into_trades(self) -> Vec<Trade> {
        self.0
    }
}
