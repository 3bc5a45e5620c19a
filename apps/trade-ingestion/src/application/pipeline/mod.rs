//! Ingestion Pipeline
//!
//! File source → parse stage → batch aggregator → persistence stage,
//! connected by bounded queues sized by worker count so a slow store
//! back-pressures the parsers. One cancellation token is polled at every
//! record read and queue pull.

mod batch_aggregator;
mod lifecycle;
mod parse_stage;
mod persistence_stage;
mod stats;

pub use batch_aggregator::{AggregatorExit, BatchAccumulator, BatchAggregator, DEFAULT_BATCH_SIZE};
pub use lifecycle::{IngestionPipeline, PipelineError, PipelineSettings};
pub use parse_stage::ParseStage;
pub use persistence_stage::{PersistenceStage, ShutdownPolicy};
pub use stats::{
    BATCH_WRITE_SECONDS, BATCHES_EMITTED, BATCHES_FAILED, BATCHES_WRITTEN, FILES_FAILED,
    FILES_PARSED, PipelineReport, PipelineStats, RECORDS_PARSED, RECORDS_SKIPPED, TRADES_WRITTEN,
};
