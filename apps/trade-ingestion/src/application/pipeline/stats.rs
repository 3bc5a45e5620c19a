//! Run counters shared by the pipeline stages.
//!
//! Every increment is mirrored to the `metrics` facade; without an
//! installed recorder those calls are no-ops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

/// Files that finished parsing.
pub const FILES_PARSED: &str = "trade_ingest_files_parsed_total";
/// Files abandoned on open or read failure.
pub const FILES_FAILED: &str = "trade_ingest_files_failed_total";
/// Records turned into trades.
pub const RECORDS_PARSED: &str = "trade_ingest_records_parsed_total";
/// Records skipped as malformed or undecodable.
pub const RECORDS_SKIPPED: &str = "trade_ingest_records_skipped_total";
/// Batches handed to the persistence stage.
pub const BATCHES_EMITTED: &str = "trade_ingest_batches_emitted_total";
/// Batches committed to the store.
pub const BATCHES_WRITTEN: &str = "trade_ingest_batches_written_total";
/// Batches lost to a store error or a closed queue.
pub const BATCHES_FAILED: &str = "trade_ingest_batches_failed_total";
/// Trades committed to the store.
pub const TRADES_WRITTEN: &str = "trade_ingest_trades_written_total";
/// Bulk insert latency.
pub const BATCH_WRITE_SECONDS: &str = "trade_ingest_batch_write_seconds";

/// Atomic counters updated concurrently by all workers of one run.
#[derive(Debug)]
pub struct PipelineStats {
    files_discovered: AtomicU64,
    files_parsed: AtomicU64,
    files_failed: AtomicU64,
    records_parsed: AtomicU64,
    records_skipped: AtomicU64,
    batches_emitted: AtomicU64,
    batches_written: AtomicU64,
    batches_failed: AtomicU64,
    trades_written: AtomicU64,
    start_time: Instant,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStats {
    /// Start a fresh set of counters; elapsed time runs from here.
    #[must_use]
    pub fn new() -> Self {
        Self {
            files_discovered: AtomicU64::new(0),
            files_parsed: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            records_parsed: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            batches_emitted: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            trades_written: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub(crate) fn files_discovered(&self, count: u64) {
        self.files_discovered.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn file_parsed(&self, records: u64, skipped: u64) {
        self.files_parsed.fetch_add(1, Ordering::Relaxed);
        counter!(FILES_PARSED).increment(1);
        self.record_counts(records, skipped);
    }

    pub(crate) fn file_failed(&self, records: u64, skipped: u64) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        counter!(FILES_FAILED).increment(1);
        self.record_counts(records, skipped);
    }

    /// Counts for a file left part-way through on cancellation.
    pub(crate) fn file_interrupted(&self, records: u64, skipped: u64) {
        self.record_counts(records, skipped);
    }

    fn record_counts(&self, records: u64, skipped: u64) {
        self.records_parsed.fetch_add(records, Ordering::Relaxed);
        self.records_skipped.fetch_add(skipped, Ordering::Relaxed);
        counter!(RECORDS_PARSED).increment(records);
        counter!(RECORDS_SKIPPED).increment(skipped);
    }

    pub(crate) fn batch_emitted(&self) {
        self.batches_emitted.fetch_add(1, Ordering::Relaxed);
        counter!(BATCHES_EMITTED).increment(1);
    }

    pub(crate) fn batch_written(&self, trades: u64, took: Duration) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.trades_written.fetch_add(trades, Ordering::Relaxed);
        counter!(BATCHES_WRITTEN).increment(1);
        counter!(TRADES_WRITTEN).increment(trades);
        histogram!(BATCH_WRITE_SECONDS).record(took.as_secs_f64());
    }

    pub(crate) fn batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        counter!(BATCHES_FAILED).increment(1);
    }

    /// Snapshot the counters.
    #[must_use]
    pub fn report(&self, cancelled: bool) -> PipelineReport {
        PipelineReport {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            files_parsed: self.files_parsed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            records_parsed: self.records_parsed.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            batches_emitted: self.batches_emitted.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            trades_written: self.trades_written.load(Ordering::Relaxed),
            cancelled,
            elapsed: self.start_time.elapsed(),
        }
    }
}

/// Summary of one pipeline run.
///
/// Partial success is normal: skipped records and failed batches are
/// reported here rather than turned into an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Files found in the input directory.
    pub files_discovered: u64,
    /// Files read to the end.
    pub files_parsed: u64,
    /// Files abandoned on open or read failure.
    pub files_failed: u64,
    /// Records turned into trades.
    pub records_parsed: u64,
    /// Records skipped as malformed.
    pub records_skipped: u64,
    /// Batches produced by the aggregator.
    pub batches_emitted: u64,
    /// Batches committed.
    pub batches_written: u64,
    /// Batches dropped after a store error.
    pub batches_failed: u64,
    /// Trades committed.
    pub trades_written: u64,
    /// Whether the run ended through cancellation.
    pub cancelled: bool,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Files neither parsed nor failed, i.e. never started because of
    /// cancellation.
    #[must_use]
    pub const fn files_unprocessed(&self) -> u64 {
        self.files_discovered
            .saturating_sub(self.files_parsed)
            .saturating_sub(self.files_failed)
    }
}
