//! Trade Loader Binary
//!
//! Ingests every dump file in a directory into the trade store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trade-loader -- ./b3Data
//! ```
//!
//! # Environment Variables
//!
//! - `DATA_DIR`: Input directory when no argument is given (default: b3Data)
//! - `FILE_EXTENSION`: Extension of dump files (default: txt)
//! - `FIELD_DELIMITER`: Single-byte delimiter (default: ;)
//! - `DB_DSN`: SQLite path or URL (default: trades.db)
//! - `WORKER_COUNT`: Fallback for both worker pools (default: CPU count)
//! - `PARSER_WORKER_COUNT`, `DB_WORKER_COUNT`: Per-pool overrides
//! - `BATCH_SIZE`: Trades per batch (default: 50000)
//! - `FLUSH_INTERVAL_SECS`: Idle flush window, 0 disables (default: 5)
//! - `PERSISTENCE_SHUTDOWN_POLICY`: drain | stop (default: drain)
//! - `RUST_LOG`: Log level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use trade_ingestion::infrastructure::config::load_dotenv;
use trade_ingestion::infrastructure::shutdown::spawn_signal_handler;
use trade_ingestion::infrastructure::telemetry;
use trade_ingestion::{CsvFileSource, IngestionPipeline, LoaderConfig, SqliteTradeRepository};

/// Load exchange trade dumps into the trade store.
#[derive(Debug, Parser)]
#[command(name = "trade-loader", version, about)]
struct Cli {
    /// Directory holding the dump files. Overrides `DATA_DIR`.
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();
    let cli = Cli::parse();

    telemetry::init();

    let mut config = LoaderConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        dsn = %config.store.dsn,
        shutdown_policy = %config.pipeline.shutdown_policy,
        "Starting trade loader"
    );

    let store = Arc::new(
        SqliteTradeRepository::open(&config.store.dsn, config.store.max_connections)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Could not open trade store"))?,
    );
    let source = Arc::new(CsvFileSource::new(
        config.file_extension.clone(),
        config.delimiter,
    ));
    let pipeline = IngestionPipeline::new(source, Arc::clone(&store), config.pipeline.clone());

    let shutdown_token = CancellationToken::new();
    let signals = spawn_signal_handler(shutdown_token.clone());

    let result = pipeline.run(&config.data_dir, shutdown_token.clone()).await;

    // Stops the signal task if the run finished on its own.
    shutdown_token.cancel();
    let _ = signals.await;
    store.close().await;

    let report = result.inspect_err(|e| tracing::error!(error = %e, "Ingestion failed"))?;
    tracing::info!(
        files = report.files_parsed,
        trades = report.trades_written,
        skipped = report.records_skipped,
        failed_batches = report.batches_failed,
        unprocessed_files = report.files_unprocessed(),
        cancelled = report.cancelled,
        "Application finished"
    );

    Ok(())
}
