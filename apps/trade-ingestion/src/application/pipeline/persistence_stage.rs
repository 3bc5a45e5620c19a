//! Persistence stage.
//!
//! A fixed pool of async workers share one queue of batches and write each
//! one to the store with a single bulk insert. A failed batch is logged and
//! dropped: there is no retry and no requeue.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::stats::PipelineStats;
use crate::application::ports::TradeRepositoryPort;
use crate::domain::trade::Batch;

/// What persistence workers do with queued batches once the run is
/// cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Keep writing until the batch queue closes. Every batch the
    /// aggregator emitted, including its final flush, reaches the store.
    #[default]
    DrainQueued,
    /// Check the token before each pull and exit once it fires. Batches
    /// still queued at that point are not written.
    StopOnCancel,
}

impl fmt::Display for ShutdownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DrainQueued => write!(f, "drain"),
            Self::StopOnCancel => write!(f, "stop"),
        }
    }
}

impl FromStr for ShutdownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drain" | "drain_queued" => Ok(Self::DrainQueued),
            "stop" | "stop_on_cancel" => Ok(Self::StopOnCancel),
            other => Err(format!("unknown shutdown policy: {other}")),
        }
    }
}

/// Persistence stage configuration and collaborators.
pub struct PersistenceStage<R>
where
    R: TradeRepositoryPort + 'static,
{
    trade_repo: Arc<R>,
    workers: usize,
    policy: ShutdownPolicy,
    stats: Arc<PipelineStats>,
}

impl<R> PersistenceStage<R>
where
    R: TradeRepositoryPort + 'static,
{
    /// Create a stage with `workers` persistence workers (at least one).
    pub fn new(
        trade_repo: Arc<R>,
        workers: usize,
        policy: ShutdownPolicy,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            trade_repo,
            workers: workers.max(1),
            policy,
            stats,
        }
    }

    /// Start the workers and return the supervisor handle, which resolves
    /// once every worker has exited.
    pub fn spawn(self, batches: mpsc::Receiver<Batch>, cancel: CancellationToken) -> JoinHandle<()> {
        let batches = Arc::new(Mutex::new(batches));

        let handles: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|worker_id| {
                let worker = PersistenceWorker {
                    worker_id,
                    trade_repo: Arc::clone(&self.trade_repo),
                    batches: Arc::clone(&batches),
                    policy: self.policy,
                    cancel: cancel.clone(),
                    stats: Arc::clone(&self.stats),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        tracing::info!(
            workers = self.workers,
            policy = %self.policy,
            "Persistence stage started"
        );

        tokio::spawn(async move {
            for (worker_id, handle) in handles.into_iter().enumerate() {
                if let Err(e) = handle.await {
                    tracing::error!(worker_id, error = %e, "Persistence worker aborted");
                }
            }
            tracing::info!("Persistence stage finished");
        })
    }
}

// ============================================================================
// Worker
// ============================================================================

struct PersistenceWorker<R> {
    worker_id: usize,
    trade_repo: Arc<R>,
    batches: Arc<Mutex<mpsc::Receiver<Batch>>>,
    policy: ShutdownPolicy,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
}

impl<R> PersistenceWorker<R>
where
    R: TradeRepositoryPort,
{
    async fn run(self) {
        let mut written = 0_u64;

        while let Some(batch) = self.next_batch().await {
            written += self.write(batch).await;
        }

        tracing::info!(
            worker_id = self.worker_id,
            trades_written = written,
            "Persistence worker exiting"
        );
    }

    async fn next_batch(&self) -> Option<Batch> {
        match self.policy {
            ShutdownPolicy::DrainQueued => self.batches.lock().await.recv().await,
            ShutdownPolicy::StopOnCancel => {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let mut queue = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return None,
                    queue = self.batches.lock() => queue,
                };
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => None,
                    batch = queue.recv() => batch,
                }
            }
        }
    }

    async fn write(&self, batch: Batch) -> u64 {
        let size = batch.len();
        let started = Instant::now();

        match self.trade_repo.bulk_insert(batch.trades()).await {
            Ok(rows) => {
                self.stats.batch_written(rows, started.elapsed());
                tracing::info!(
                    worker_id = self.worker_id,
                    trades_written = rows,
                    took_ms = started.elapsed().as_millis() as u64,
                    "Batch written"
                );
                rows
            }
            Err(e) => {
                self.stats.batch_failed();
                tracing::error!(
                    worker_id = self.worker_id,
                    trades = size,
                    error = %e,
                    "Batch write failed, batch dropped"
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockTradeRepositoryPort, RepositoryError};
    use crate::domain::shared::Ticker;
    use crate::domain::trade::Trade;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn batch(size: usize) -> Batch {
        let trades = (0..size)
            .map(|i| Trade {
                ticker: Ticker::parse("VALE3").unwrap(),
                hour: "101010".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                price: Decimal::new(6123, 2),
                quantity: i as i64,
            })
            .collect();
        Batch::new(trades).unwrap()
    }

    #[test]
    fn policy_parses_from_env_values() {
        assert_eq!("drain".parse::<ShutdownPolicy>(), Ok(ShutdownPolicy::DrainQueued));
        assert_eq!(" STOP ".parse::<ShutdownPolicy>(), Ok(ShutdownPolicy::StopOnCancel));
        assert!("later".parse::<ShutdownPolicy>().is_err());
        assert_eq!(ShutdownPolicy::default().to_string(), "drain");
    }

    #[tokio::test]
    async fn failed_batch_is_dropped_not_retried() {
        let mut repo = MockTradeRepositoryPort::new();
        let mut calls = 0;
        repo.expect_bulk_insert().times(2).returning(move |trades| {
            calls += 1;
            if calls == 1 {
                Err(RepositoryError::Query("database is locked".to_string()))
            } else {
                Ok(trades.len() as u64)
            }
        });

        let stats = Arc::new(PipelineStats::new());
        let (tx, rx) = mpsc::channel(4);
        let handle = PersistenceStage::new(
            Arc::new(repo),
            1,
            ShutdownPolicy::DrainQueued,
            Arc::clone(&stats),
        )
        .spawn(rx, CancellationToken::new());

        tx.send(batch(3)).await.unwrap();
        tx.send(batch(2)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let report = stats.report(false);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.batches_written, 1);
        assert_eq!(report.trades_written, 2);
    }

    #[tokio::test]
    async fn drain_policy_writes_queued_batches_after_cancel() {
        let mut repo = MockTradeRepositoryPort::new();
        repo.expect_bulk_insert()
            .times(3)
            .returning(|trades| Ok(trades.len() as u64));

        let stats = Arc::new(PipelineStats::new());
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        for _ in 0..3 {
            tx.send(batch(1)).await.unwrap();
        }
        cancel.cancel();
        drop(tx);

        PersistenceStage::new(Arc::new(repo), 2, ShutdownPolicy::DrainQueued, Arc::clone(&stats))
            .spawn(rx, cancel)
            .await
            .unwrap();

        assert_eq!(stats.report(true).batches_written, 3);
    }

    #[tokio::test]
    async fn stop_policy_leaves_queued_batches() {
        let mut repo = MockTradeRepositoryPort::new();
        repo.expect_bulk_insert().never();

        let stats = Arc::new(PipelineStats::new());
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        tx.send(batch(1)).await.unwrap();
        cancel.cancel();

        PersistenceStage::new(Arc::new(repo), 2, ShutdownPolicy::StopOnCancel, Arc::clone(&stats))
            .spawn(rx, cancel)
            .await
            .unwrap();

        assert_eq!(stats.report(true).batches_written, 0);
        drop(tx);
    }

    #[tokio::test]
    async fn stop_policy_wakes_idle_workers_on_cancel() {
        let repo = MockTradeRepositoryPort::new();
        let cancel = CancellationToken::new();
        let (_tx, rx) = mpsc::channel::<Batch>(4);

        let handle = PersistenceStage::new(
            Arc::new(repo),
            3,
            ShutdownPolicy::StopOnCancel,
            Arc::new(PipelineStats::new()),
        )
        .spawn(rx, cancel.clone());

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("workers should exit on cancel")
            .unwrap();
    }
}
