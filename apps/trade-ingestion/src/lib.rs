// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Trade Ingestion - Exchange Dump Loader
//!
//! Loads large delimited trade dumps into a persistent store with bounded
//! memory, then answers per-ticker aggregation queries over the stored rows.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Trade entities and pure computations
//!   - `trade`: `Trade`, `Batch`, `TradeInfo`, and the record parser
//!   - `metrics`: max price and peak daily volume over a result set
//!   - `shared`: `Ticker` value object and domain errors
//!
//! - **Application**: Use cases, ports, and the ingestion pipeline
//!   - `ports`: `TradeRepositoryPort`, `TradeFileSource`
//!   - `use_cases`: `ComputeTickerMetrics`
//!   - `pipeline`: parse stage, batch aggregator, persistence stage, lifecycle
//!
//! - **Infrastructure**: Adapters
//!   - `files`: directory discovery and `;`-delimited record streams
//!   - `persistence`: SQLite and in-memory trade stores
//!   - `http`: metrics REST endpoint
//!   - `config`, `telemetry`, `metrics`, `shutdown`
//!
//! # Data Flow
//!
//! ```text
//!  data dir ──► file queue ──► parse workers (N) ──► trade queue
//!                                                       │
//!              store ◄── persistence workers (M) ◄── batch aggregator
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Trade entities and pure computations.
pub mod domain;

/// Application layer - Use cases, ports, and the ingestion pipeline.
pub mod application;

/// Infrastructure layer - Adapters and process plumbing.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::metrics::TickerMetrics;
pub use domain::shared::{DomainError, Ticker};
pub use domain::trade::{Batch, ColumnLayout, RecordError, Trade, TradeInfo, parse_record};

// Application
pub use application::pipeline::{
    IngestionPipeline, PipelineError, PipelineReport, PipelineSettings, ShutdownPolicy,
};
pub use application::ports::{RepositoryError, TradeFileSource, TradeRepositoryPort};
pub use application::use_cases::{ComputeTickerMetricsUseCase, MetricsError};

// Infrastructure
pub use infrastructure::config::{ApiConfig, ConfigError, LoaderConfig};
pub use infrastructure::files::CsvFileSource;
pub use infrastructure::http::ApiError;
pub use infrastructure::persistence::{InMemoryTradeRepository, SqliteTradeRepository};
pub use infrastructure::telemetry::{TelemetryConfig, init as init_telemetry};
