//! Parse stage.
//!
//! A fixed pool of blocking workers share one queue of file paths. Each
//! worker streams a file record by record through the parser and hands
//! valid trades to the aggregator. Bad records are skipped, bad files are
//! abandoned, and neither stops the worker.
//!
//! The trade queue is closed by the stage supervisor once every worker has
//! exited, so the aggregator sees end-of-stream exactly once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::stats::PipelineStats;
use crate::application::ports::{StreamError, TradeFileSource};
use crate::domain::trade::{ColumnLayout, RecordError, Trade, parse_record};

/// Parse stage configuration and collaborators.
pub struct ParseStage<S>
where
    S: TradeFileSource + 'static,
{
    source: Arc<S>,
    layout: ColumnLayout,
    workers: usize,
    stats: Arc<PipelineStats>,
}

impl<S> ParseStage<S>
where
    S: TradeFileSource + 'static,
{
    /// Create a stage with `workers` parse workers (at least one).
    pub fn new(
        source: Arc<S>,
        layout: ColumnLayout,
        workers: usize,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            source,
            layout,
            workers: workers.max(1),
            stats,
        }
    }

    /// Start the workers and return the supervisor handle.
    ///
    /// The supervisor owns `trades` and drops it after the last worker has
    /// been joined.
    pub fn spawn(
        self,
        files: mpsc::Receiver<PathBuf>,
        trades: mpsc::Sender<Trade>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let files = Arc::new(Mutex::new(files));

        let handles: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|worker_id| {
                let worker = ParseWorker {
                    worker_id,
                    source: Arc::clone(&self.source),
                    layout: self.layout,
                    files: Arc::clone(&files),
                    trades: trades.clone(),
                    cancel: cancel.clone(),
                    stats: Arc::clone(&self.stats),
                };
                tokio::task::spawn_blocking(move || worker.run())
            })
            .collect();

        tracing::info!(workers = self.workers, "Parse stage started");

        tokio::spawn(async move {
            for (worker_id, handle) in handles.into_iter().enumerate() {
                if let Err(e) = handle.await {
                    tracing::error!(worker_id, error = %e, "Parse worker aborted");
                }
            }
            drop(trades);
            tracing::info!("Parse stage finished, trade queue closed");
        })
    }
}

// ============================================================================
// Worker
// ============================================================================

enum FileOutcome {
    Completed,
    Failed,
    Cancelled,
    DownstreamClosed,
}

enum RecordFailure {
    Parse(RecordError),
    Stream(StreamError),
}

struct ParseWorker<S> {
    worker_id: usize,
    source: Arc<S>,
    layout: ColumnLayout,
    files: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    trades: mpsc::Sender<Trade>,
    cancel: CancellationToken,
    stats: Arc<PipelineStats>,
}

impl<S> ParseWorker<S>
where
    S: TradeFileSource,
{
    fn run(self) {
        let mut files_done = 0_u64;

        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(worker_id = self.worker_id, "Parse worker cancelled");
                break;
            }

            let next = self.files.blocking_lock().blocking_recv();
            let Some(path) = next else {
                break;
            };

            match self.parse_file(&path) {
                FileOutcome::Completed => files_done += 1,
                FileOutcome::Failed => {}
                FileOutcome::Cancelled | FileOutcome::DownstreamClosed => break,
            }
        }

        tracing::debug!(
            worker_id = self.worker_id,
            files = files_done,
            "Parse worker exiting"
        );
    }

    fn parse_file(&self, path: &Path) -> FileOutcome {
        let mut stream = match self.source.open(path) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(worker_id = self.worker_id, error = %e, "Failed to open file");
                self.stats.file_failed(0, 0);
                return FileOutcome::Failed;
            }
        };

        let header_failure = match stream.next_record() {
            Some(Ok(_)) => None,
            Some(Err(e)) => Some(e.to_string()),
            None => Some("missing header".to_string()),
        };
        if let Some(reason) = header_failure {
            tracing::error!(
                worker_id = self.worker_id,
                file = %path.display(),
                error = %reason,
                "Failed to read header"
            );
            self.stats.file_failed(0, 0);
            return FileOutcome::Failed;
        }

        let mut parsed = 0_u64;
        let mut skipped = 0_u64;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    worker_id = self.worker_id,
                    file = %path.display(),
                    trades = parsed,
                    "Stopped mid-file on cancellation"
                );
                self.stats.file_interrupted(parsed, skipped);
                return FileOutcome::Cancelled;
            }

            let outcome = match stream.next_record() {
                None => break,
                Some(Ok(record)) => parse_record(record, &self.layout).map_err(RecordFailure::Parse),
                Some(Err(e)) => Err(RecordFailure::Stream(e)),
            };

            let trade = match outcome {
                Ok(trade) => trade,
                Err(RecordFailure::Stream(e)) if e.is_fatal() => {
                    tracing::error!(
                        worker_id = self.worker_id,
                        file = %path.display(),
                        error = %e,
                        "Abandoning file"
                    );
                    self.stats.file_failed(parsed, skipped);
                    return FileOutcome::Failed;
                }
                Err(RecordFailure::Stream(e)) => {
                    skipped += 1;
                    tracing::debug!(file = %path.display(), error = %e, "Skipping record");
                    continue;
                }
                Err(RecordFailure::Parse(e)) => {
                    skipped += 1;
                    tracing::debug!(
                        file = %path.display(),
                        line = stream.line(),
                        error = %e,
                        "Skipping record"
                    );
                    continue;
                }
            };

            if self.trades.blocking_send(trade).is_err() {
                tracing::warn!(
                    worker_id = self.worker_id,
                    file = %path.display(),
                    "Trade queue closed, stopping"
                );
                self.stats.file_interrupted(parsed, skipped);
                return FileOutcome::DownstreamClosed;
            }
            parsed += 1;
        }

        self.stats.file_parsed(parsed, skipped);
        tracing::info!(
            worker_id = self.worker_id,
            file = %path.display(),
            trades = parsed,
            skipped,
            "File parsed"
        );
        FileOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{RecordStream, SourceError};
    use crate::domain::trade::RawRecord;
    use std::collections::{HashMap, VecDeque};
    use std::io;

    enum Step {
        Row(Vec<String>),
        Fail(StreamError),
        /// Yield the row, then cancel the run.
        RowThenCancel(Vec<String>, CancellationToken),
    }

    struct ScriptedStream {
        steps: VecDeque<Step>,
        current: Vec<String>,
        line: u64,
    }

    impl RecordStream for ScriptedStream {
        fn next_record(&mut self) -> Option<Result<&dyn RawRecord, StreamError>> {
            let step = self.steps.pop_front()?;
            self.line += 1;
            match step {
                Step::Row(fields) => self.current = fields,
                Step::Fail(e) => return Some(Err(e)),
                Step::RowThenCancel(fields, cancel) => {
                    self.current = fields;
                    cancel.cancel();
                }
            }
            let record: &dyn RawRecord = &self.current;
            Some(Ok(record))
        }

        fn line(&self) -> u64 {
            self.line
        }
    }

    /// Files keyed by name; `None` fails to open.
    #[derive(Default)]
    struct ScriptedSource {
        files: std::sync::Mutex<HashMap<PathBuf, Option<Vec<Step>>>>,
    }

    impl ScriptedSource {
        fn with(self, name: &str, steps: Option<Vec<Step>>) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(name), steps);
            self
        }
    }

    impl TradeFileSource for ScriptedSource {
        fn list(&self, _dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
            Ok(self.files.lock().unwrap().keys().cloned().collect())
        }

        fn open(&self, file: &Path) -> Result<Box<dyn RecordStream>, SourceError> {
            let script = self.files.lock().unwrap().remove(file).flatten();
            script
                .map(|steps| {
                    Box::new(ScriptedStream {
                        steps: steps.into(),
                        current: Vec::new(),
                        line: 0,
                    }) as Box<dyn RecordStream>
                })
                .ok_or_else(|| SourceError::FileUnreadable {
                    path: file.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
                })
        }
    }

    fn header() -> Step {
        Step::Row(vec!["DataReferencia".to_string(), "CodigoInstrumento".to_string()])
    }

    fn fields(quantity: i64) -> Vec<String> {
        let quantity = quantity.to_string();
        [
            "2024-03-01", "PETR4", "0", "38,50", quantity.as_str(), "100000123", "10", "1",
            "2024-03-01", "8", "3",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn row(quantity: i64) -> Step {
        Step::Row(fields(quantity))
    }

    fn io_error() -> Step {
        Step::Fail(StreamError::Io {
            line: 0,
            message: "device gone".to_string(),
        })
    }

    /// Run one parse worker over `order` and collect what it emitted.
    async fn run_stage(
        source: ScriptedSource,
        order: &[&str],
        cancel: CancellationToken,
    ) -> (Vec<Trade>, Arc<PipelineStats>) {
        let stats = Arc::new(PipelineStats::new());
        let (file_tx, file_rx) = mpsc::channel(order.len().max(1));
        let (trade_tx, mut trade_rx) = mpsc::channel(64);

        for name in order {
            file_tx.send(PathBuf::from(name)).await.unwrap();
        }
        drop(file_tx);

        let handle = ParseStage::new(
            Arc::new(source),
            ColumnLayout::default(),
            1,
            Arc::clone(&stats),
        )
        .spawn(file_rx, trade_tx, cancel);

        let mut trades = Vec::new();
        while let Some(trade) = trade_rx.recv().await {
            trades.push(trade);
        }
        handle.await.unwrap();
        (trades, stats)
    }

    #[tokio::test]
    async fn bad_files_are_abandoned_and_the_worker_moves_on() {
        let source = ScriptedSource::default()
            .with("unopenable.txt", None)
            .with("empty.txt", Some(vec![]))
            .with(
                "bad_header.txt",
                Some(vec![
                    Step::Fail(StreamError::Record {
                        line: 1,
                        message: "invalid utf-8".to_string(),
                    }),
                    row(99),
                ]),
            )
            .with(
                "truncated.txt",
                Some(vec![header(), row(1), row(2), io_error(), row(98)]),
            )
            .with("good.txt", Some(vec![header(), row(3), row(4), row(5)]));

        let (trades, stats) = run_stage(
            source,
            &["unopenable.txt", "empty.txt", "bad_header.txt", "truncated.txt", "good.txt"],
            CancellationToken::new(),
        )
        .await;

        let quantities: Vec<i64> = trades.iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 3, 4, 5]);

        let report = stats.report(false);
        assert_eq!(report.files_failed, 4);
        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.records_parsed, 5);
        assert_eq!(report.records_skipped, 0);
    }

    #[tokio::test]
    async fn bad_records_are_skipped_without_failing_the_file() {
        let source = ScriptedSource::default().with(
            "mixed.txt",
            Some(vec![
                header(),
                row(1),
                Step::Row(vec!["2024-03-01".to_string(), "PETR4".to_string()]),
                Step::Fail(StreamError::Record {
                    line: 4,
                    message: "invalid utf-8".to_string(),
                }),
                row(2),
            ]),
        );

        let (trades, stats) = run_stage(source, &["mixed.txt"], CancellationToken::new()).await;

        assert_eq!(trades.len(), 2);
        let report = stats.report(false);
        assert_eq!(report.files_parsed, 1);
        assert_eq!(report.files_failed, 0);
        assert_eq!(report.records_skipped, 2);
    }

    #[tokio::test]
    async fn cancellation_mid_file_stops_before_the_next_record() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource::default()
            .with(
                "first.txt",
                Some(vec![
                    header(),
                    row(1),
                    Step::RowThenCancel(fields(2), cancel.clone()),
                    row(3),
                    row(4),
                ]),
            )
            .with("second.txt", Some(vec![header(), row(5)]));

        let (trades, stats) = run_stage(source, &["first.txt", "second.txt"], cancel).await;

        let quantities: Vec<i64> = trades.iter().map(|t| t.quantity).collect();
        assert_eq!(quantities, vec![1, 2]);

        // Neither parsed nor failed: the first was interrupted, the second never opened.
        let report = stats.report(true);
        assert_eq!(report.files_parsed, 0);
        assert_eq!(report.files_failed, 0);
        assert_eq!(report.records_parsed, 2);
    }
}
