//! Trade Metrics API Binary
//!
//! Serves `GET /trades`, `/health` and `/metrics` over the trade store.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trade-api
//! curl 'localhost:8080/trades?ticker=PETR4&trade_date=2024-03-01'
//! ```
//!
//! # Environment Variables
//!
//! - `API_PORT`: HTTP port (default: 8080)
//! - `DB_DSN`: SQLite path or URL (default: trades.db)
//! - `DB_MAX_CONNECTIONS`: Reader pool size (default: 8)
//! - `RUST_LOG`: Log level (default: info)

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use trade_ingestion::infrastructure::config::load_dotenv;
use trade_ingestion::infrastructure::http::{AppState, create_router};
use trade_ingestion::infrastructure::metrics::init_metrics;
use trade_ingestion::infrastructure::shutdown::{SHUTDOWN_TIMEOUT, spawn_signal_handler};
use trade_ingestion::infrastructure::telemetry;
use trade_ingestion::{ApiConfig, SqliteTradeRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    telemetry::init();
    let _metrics_handle = init_metrics();

    let config = ApiConfig::from_env()?;

    let store = Arc::new(
        SqliteTradeRepository::open(&config.store.dsn, config.store.max_connections).await?,
    );
    let router = create_router(AppState::new(Arc::clone(&store)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        dsn = %config.store.dsn,
        "Trade API listening"
    );

    let shutdown_token = CancellationToken::new();
    let signals = spawn_signal_handler(shutdown_token.clone());

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_token.clone().cancelled_owned())
        .into_future();

    let served = tokio::select! {
        result = server => result,
        () = async {
            shutdown_token.cancelled().await;
            tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
        } => {
            tracing::warn!("Shutdown timeout reached, dropping open connections");
            Ok(())
        }
    };

    shutdown_token.cancel();
    let _ = signals.await;
    store.close().await;

    served?;
    tracing::info!("Trade API stopped");
    Ok(())
}
