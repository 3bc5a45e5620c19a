//! Application Use Cases

mod compute_ticker_metrics;

pub use compute_ticker_metrics::{ComputeTickerMetricsUseCase, MetricsError};
