//! Batch aggregator.
//!
//! Single routine between the parse and persistence stages. Groups trades
//! into batches of a fixed target size, flushes the remainder when the
//! trade queue closes or the run is cancelled, and optionally flushes a
//! partial batch after an idle window.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::stats::PipelineStats;
use crate::domain::trade::{Batch, Trade};

/// Default number of trades per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

// ============================================================================
// Accumulator
// ============================================================================

/// Fills batches up to a target size.
#[derive(Debug)]
pub struct BatchAccumulator {
    target: usize,
    pending: Vec<Trade>,
}

impl BatchAccumulator {
    /// Accumulator emitting batches of `target` trades (at least one).
    #[must_use]
    pub fn new(target: usize) -> Self {
        let target = target.max(1);
        Self {
            target,
            pending: Vec::with_capacity(target.min(DEFAULT_BATCH_SIZE)),
        }
    }

    /// Append a trade; returns the completed batch when the target is hit.
    pub fn push(&mut self, trade: Trade) -> Option<Batch> {
        self.pending.push(trade);
        if self.pending.len() >= self.target {
            self.flush()
        } else {
            None
        }
    }

    /// Take whatever is pending as a batch; `None` when empty.
    pub fn flush(&mut self) -> Option<Batch> {
        let capacity = self.target.min(DEFAULT_BATCH_SIZE);
        Batch::new(std::mem::replace(
            &mut self.pending,
            Vec::with_capacity(capacity),
        ))
    }

    /// Trades waiting for the next batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Aggregator Task
// ============================================================================

/// Why the aggregator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorExit {
    /// Trade queue closed after the parse stage drained.
    Drained,
    /// Cancellation observed.
    Cancelled,
    /// Persistence stage stopped accepting batches.
    DownstreamClosed,
}

/// The aggregating routine.
pub struct BatchAggregator {
    batch_size: usize,
    idle_flush: Option<Duration>,
    stats: Arc<PipelineStats>,
}

impl BatchAggregator {
    /// Create an aggregator. `idle_flush` of `None` disables time-boxed
    /// flushing, so every batch but the last is exactly `batch_size`.
    pub fn new(batch_size: usize, idle_flush: Option<Duration>, stats: Arc<PipelineStats>) -> Self {
        Self {
            batch_size,
            idle_flush: idle_flush.filter(|d| !d.is_zero()),
            stats,
        }
    }

    /// Run until the trade queue closes or `cancel` fires.
    ///
    /// The pending trades are flushed on both paths, so at most one
    /// undersized batch follows a cancellation. `batches` is dropped on
    /// return, closing the persistence queue.
    pub async fn run(
        self,
        mut trades: mpsc::Receiver<Trade>,
        batches: mpsc::Sender<Batch>,
        cancel: CancellationToken,
    ) -> AggregatorExit {
        let mut accumulator = BatchAccumulator::new(self.batch_size);
        let mut deadline = self.next_deadline();

        tracing::info!(
            batch_size = self.batch_size,
            idle_flush = ?self.idle_flush,
            "Batch aggregator started"
        );

        let exit = loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!(pending = accumulator.len(), "Aggregator cancelled, flushing");
                    if let Some(batch) = accumulator.flush() {
                        self.emit(&batches, batch).await;
                    }
                    break AggregatorExit::Cancelled;
                }

                next = trades.recv() => {
                    let Some(trade) = next else {
                        if let Some(batch) = accumulator.flush() {
                            self.emit(&batches, batch).await;
                        }
                        break AggregatorExit::Drained;
                    };
                    if let Some(batch) = accumulator.push(trade) {
                        if !self.emit(&batches, batch).await {
                            break AggregatorExit::DownstreamClosed;
                        }
                        deadline = self.next_deadline();
                    }
                }

                () = sleep_until(deadline), if self.idle_flush.is_some() && !accumulator.is_empty() => {
                    if let Some(batch) = accumulator.flush() {
                        tracing::debug!(trades = batch.len(), "Idle flush");
                        if !self.emit(&batches, batch).await {
                            break AggregatorExit::DownstreamClosed;
                        }
                    }
                    deadline = self.next_deadline();
                }
            }
        };

        drop(batches);
        tracing::info!(exit = ?exit, "Batch aggregator finished, batch queue closed");
        exit
    }

    fn next_deadline(&self) -> Instant {
        // Far-future sentinel when idle flushing is off; the branch is
        // disabled anyway.
        Instant::now() + self.idle_flush.unwrap_or(Duration::from_secs(86_400))
    }

    async fn emit(&self, batches: &mpsc::Sender<Batch>, batch: Batch) -> bool {
        let size = batch.len();
        self.stats.batch_emitted();
        if batches.send(batch).await.is_err() {
            tracing::error!(trades = size, "Batch queue closed, batch dropped");
            self.stats.batch_failed();
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Ticker;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn trade(quantity: i64) -> Trade {
        Trade {
            ticker: Ticker::parse("PETR4").unwrap(),
            hour: "100000".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            price: Decimal::new(3050, 2),
            quantity,
        }
    }

    fn sizes_for(total: usize, target: usize) -> Vec<usize> {
        let mut accumulator = BatchAccumulator::new(target);
        let mut sizes = Vec::new();
        for i in 0..total {
            if let Some(batch) = accumulator.push(trade(i as i64)) {
                sizes.push(batch.len());
            }
        }
        if let Some(batch) = accumulator.flush() {
            sizes.push(batch.len());
        }
        sizes
    }

    #[test]
    fn emits_at_target() {
        assert_eq!(sizes_for(7, 3), vec![3, 3, 1]);
        assert_eq!(sizes_for(6, 3), vec![3, 3]);
        assert!(sizes_for(0, 3).is_empty());
    }

    #[test]
    fn zero_target_behaves_as_one() {
        assert_eq!(sizes_for(3, 0), vec![1, 1, 1]);
    }

    #[test]
    fn flush_on_empty_is_none() {
        let mut accumulator = BatchAccumulator::new(10);
        assert!(accumulator.flush().is_none());
        assert!(accumulator.is_empty());
    }

    proptest! {
        #[test]
        fn batches_are_full_except_last(total in 0_usize..500, target in 1_usize..64) {
            let sizes = sizes_for(total, target);

            prop_assert_eq!(sizes.iter().sum::<usize>(), total);
            if let Some((last, full)) = sizes.split_last() {
                prop_assert!(full.iter().all(|&s| s == target));
                prop_assert!(*last >= 1 && *last <= target);
            }
        }
    }

    fn aggregator(batch_size: usize, idle: Option<Duration>) -> BatchAggregator {
        BatchAggregator::new(batch_size, idle, Arc::new(PipelineStats::new()))
    }

    #[tokio::test]
    async fn flushes_remainder_when_upstream_closes() {
        let (trade_tx, trade_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(16);

        let task = tokio::spawn(aggregator(4, None).run(trade_rx, batch_tx, CancellationToken::new()));
        for i in 0..10 {
            trade_tx.send(trade(i)).await.unwrap();
        }
        drop(trade_tx);

        let mut sizes = Vec::new();
        while let Some(batch) = batch_rx.recv().await {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(task.await.unwrap(), AggregatorExit::Drained);
    }

    #[tokio::test]
    async fn cancellation_flushes_pending_once() {
        let (trade_tx, trade_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(aggregator(100, None).run(trade_rx, batch_tx, cancel.clone()));
        for i in 0..5 {
            trade_tx.send(trade(i)).await.unwrap();
        }
        // Wait until the aggregator has pulled everything off the queue.
        while trade_tx.capacity() < 16 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        let exit = task.await.unwrap();
        assert_eq!(exit, AggregatorExit::Cancelled);

        let batch = batch_rx.recv().await.unwrap();
        let quantities: Vec<i64> = batch.trades().iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![0, 1, 2, 3, 4]);
        assert!(batch_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_window_flushes_partial_batch() {
        let (trade_tx, trade_rx) = mpsc::channel(16);
        let (batch_tx, mut batch_rx) = mpsc::channel(16);

        let _task = tokio::spawn(
            aggregator(100, Some(Duration::from_secs(5))).run(trade_rx, batch_tx, CancellationToken::new()),
        );
        trade_tx.send(trade(1)).await.unwrap();
        trade_tx.send(trade(2)).await.unwrap();

        let batch = batch_rx.recv().await.unwrap();
        assert_eq!(batch.len(), 2);

        drop(trade_tx);
        assert!(batch_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_downstream_stops_aggregator() {
        let (trade_tx, trade_rx) = mpsc::channel(16);
        let (batch_tx, batch_rx) = mpsc::channel(1);
        drop(batch_rx);

        let task = tokio::spawn(aggregator(1, None).run(trade_rx, batch_tx, CancellationToken::new()));
        trade_tx.send(trade(1)).await.unwrap();

        assert_eq!(task.await.unwrap(), AggregatorExit::DownstreamClosed);
    }
}
