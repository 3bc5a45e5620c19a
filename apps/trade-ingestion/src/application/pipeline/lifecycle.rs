//! Pipeline lifecycle.
//!
//! Wires file discovery, the parse stage, the batch aggregator, and the
//! persistence stage with bounded queues, then waits for them in order:
//!
//! ```text
//! dispatch files ─► close file queue
//!   └─► parse stage done ─► close trade queue
//!         └─► aggregator done ─► close batch queue
//!               └─► persistence stage done ─► report
//! ```
//!
//! Natural completion and cancellation take the same path; cancellation
//! only makes each stage stop producing earlier.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::batch_aggregator::{BatchAggregator, DEFAULT_BATCH_SIZE};
use super::parse_stage::ParseStage;
use super::persistence_stage::{PersistenceStage, ShutdownPolicy};
use super::stats::{PipelineReport, PipelineStats};
use crate::application::ports::{SourceError, TradeFileSource, TradeRepositoryPort};
use crate::domain::trade::ColumnLayout;

/// Fatal pipeline errors. Per-record and per-batch failures never surface
/// here; they are counted in the [`PipelineReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input directory could not be listed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A stage supervisor panicked or was aborted.
    #[error("{stage} stage aborted: {message}")]
    StageAborted {
        /// Stage name.
        stage: &'static str,
        /// Join error message.
        message: String,
    },
}

/// Tuning for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parse workers.
    pub parser_workers: usize,
    /// Persistence workers.
    pub persistence_workers: usize,
    /// Trades per batch.
    pub batch_size: usize,
    /// Flush a partial batch after this long without a completed batch.
    /// Batches other than the last are exactly `batch_size` only when this
    /// is `None`.
    pub idle_flush: Option<Duration>,
    /// Persistence behaviour once cancelled.
    pub shutdown_policy: ShutdownPolicy,
    /// Record column positions.
    pub layout: ColumnLayout,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            parser_workers: parallelism,
            persistence_workers: parallelism,
            batch_size: DEFAULT_BATCH_SIZE,
            idle_flush: Some(Duration::from_secs(5)),
            shutdown_policy: ShutdownPolicy::default(),
            layout: ColumnLayout::default(),
        }
    }
}

/// The ingestion pipeline over a file source and a trade store.
pub struct IngestionPipeline<S, R>
where
    S: TradeFileSource + 'static,
    R: TradeRepositoryPort + 'static,
{
    source: Arc<S>,
    trade_repo: Arc<R>,
    settings: PipelineSettings,
}

impl<S, R> IngestionPipeline<S, R>
where
    S: TradeFileSource + 'static,
    R: TradeRepositoryPort + 'static,
{
    /// Create a pipeline.
    pub const fn new(source: Arc<S>, trade_repo: Arc<R>, settings: PipelineSettings) -> Self {
        Self {
            source,
            trade_repo,
            settings,
        }
    }

    /// Settings this pipeline runs with.
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Ingest every recognized file in `dir`, returning once all stages
    /// have drained or `cancel` has stopped them.
    ///
    /// Only a failure to list `dir` is an error.
    pub async fn run(
        &self,
        dir: &Path,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let stats = Arc::new(PipelineStats::new());
        let settings = &self.settings;

        let files = self.source.list(dir)?;
        stats.files_discovered(files.len() as u64);
        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            parser_workers = settings.parser_workers,
            persistence_workers = settings.persistence_workers,
            batch_size = settings.batch_size,
            "Starting ingestion"
        );

        let parser_workers = settings.parser_workers.max(1);
        let persistence_workers = settings.persistence_workers.max(1);
        let (file_tx, file_rx) = mpsc::channel::<PathBuf>(parser_workers);
        let (trade_tx, trade_rx) = mpsc::channel(parser_workers);
        let (batch_tx, batch_rx) = mpsc::channel(persistence_workers);

        let persistence = PersistenceStage::new(
            Arc::clone(&self.trade_repo),
            persistence_workers,
            settings.shutdown_policy,
            Arc::clone(&stats),
        )
        .spawn(batch_rx, cancel.clone());

        let aggregator = tokio::spawn(
            BatchAggregator::new(settings.batch_size, settings.idle_flush, Arc::clone(&stats))
                .run(trade_rx, batch_tx, cancel.clone()),
        );

        let parse = ParseStage::new(
            Arc::clone(&self.source),
            settings.layout,
            parser_workers,
            Arc::clone(&stats),
        )
        .spawn(file_rx, trade_tx, cancel.clone());

        let dispatcher = tokio::spawn(dispatch(files, file_tx, cancel.clone()));

        join_stage("dispatch", dispatcher).await?;
        join_stage("parse", parse).await?;
        let exit = join_stage("aggregate", aggregator).await?;
        join_stage("persist", persistence).await?;

        let report = stats.report(cancel.is_cancelled());
        tracing::info!(
            aggregator_exit = ?exit,
            files_parsed = report.files_parsed,
            files_failed = report.files_failed,
            records_skipped = report.records_skipped,
            batches_failed = report.batches_failed,
            trades_written = report.trades_written,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingestion finished"
        );
        Ok(report)
    }
}

/// Feed file paths to the parse workers, then close the queue.
async fn dispatch(files: Vec<PathBuf>, queue: mpsc::Sender<PathBuf>, cancel: CancellationToken) {
    for file in files {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!("Dispatch cancelled");
                break;
            }
            sent = queue.send(file) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

async fn join_stage<T>(
    stage: &'static str,
    handle: tokio::task::JoinHandle<T>,
) -> Result<T, PipelineError> {
    handle.await.map_err(|e| PipelineError::StageAborted {
        stage,
        message: e.to_string(),
    })
}
