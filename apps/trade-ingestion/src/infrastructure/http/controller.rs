//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to `ComputeTickerMetricsUseCase`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::ports::TradeRepositoryPort;
use crate::application::use_cases::ComputeTickerMetricsUseCase;
use crate::infrastructure::metrics::{get_metrics_handle, record_api_request};

use super::error::ApiError;
use super::request::TradesQuery;
use super::response::{HealthResponse, TickerMetricsResponse};

/// Application state shared across handlers.
pub struct AppState<R>
where
    R: TradeRepositoryPort,
{
    /// Use case for per-ticker metrics.
    pub metrics: Arc<ComputeTickerMetricsUseCase<R>>,
    /// Application version.
    pub version: String,
}

impl<R> Clone for AppState<R>
where
    R: TradeRepositoryPort,
{
    fn clone(&self) -> Self {
        Self {
            metrics: Arc::clone(&self.metrics),
            version: self.version.clone(),
        }
    }
}

impl<R> AppState<R>
where
    R: TradeRepositoryPort,
{
    /// Wire the use case over `trade_repo`.
    pub fn new(trade_repo: Arc<R>) -> Self {
        Self {
            metrics: Arc::new(ComputeTickerMetricsUseCase::new(trade_repo)),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<R>(state: AppState<R>) -> Router
where
    R: TradeRepositoryPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/trades", get(ticker_metrics))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<R>(State(state): State<AppState<R>>) -> impl IntoResponse
where
    R: TradeRepositoryPort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// `GET /trades?ticker=...&trade_date=YYYY-MM-DD`
async fn ticker_metrics<R>(
    State(state): State<AppState<R>>,
    Query(query): Query<TradesQuery>,
) -> Response
where
    R: TradeRepositoryPort,
{
    let started = Instant::now();

    let response = match compute(&state, &query).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    };

    record_api_request(response.status().as_u16(), started.elapsed());
    response
}

async fn compute<R>(
    state: &AppState<R>,
    query: &TradesQuery,
) -> Result<TickerMetricsResponse, ApiError>
where
    R: TradeRepositoryPort,
{
    let (ticker, date) = query.validate()?;

    let metrics = state.metrics.execute(&ticker, date).await.map_err(|e| {
        tracing::error!(ticker = %ticker, date = ?date, error = %e, "Metrics query failed");
        ApiError::Internal
    })?;

    Ok(TickerMetricsResponse::new(&ticker, metrics))
}

/// Prometheus scrape endpoint.
async fn prometheus_metrics() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}
