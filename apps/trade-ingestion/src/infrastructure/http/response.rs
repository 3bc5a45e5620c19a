//! HTTP response DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::metrics::TickerMetrics;
use crate::domain::shared::Ticker;

/// Body of a successful `GET /trades`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMetricsResponse {
    /// Queried ticker.
    pub ticker: String,
    /// Highest traded price, serialized as a decimal string.
    #[serde(with = "rust_decimal::serde::str")]
    pub max_range_value: Decimal,
    /// Largest single-day summed quantity.
    pub max_daily_volume: i64,
}

impl TickerMetricsResponse {
    /// Build from the computed metrics.
    #[must_use]
    pub fn new(ticker: &Ticker, metrics: TickerMetrics) -> Self {
        Self {
            ticker: ticker.as_str().to_string(),
            max_range_value: metrics.max_price,
            max_daily_volume: metrics.max_daily_volume,
        }
    }
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn price_serializes_as_string() {
        let ticker = Ticker::parse("WINJ24").unwrap();
        let response = TickerMetricsResponse::new(
            &ticker,
            TickerMetrics {
                max_price: Decimal::from_str("128545.50").unwrap(),
                max_daily_volume: 12,
            },
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ticker"], "WINJ24");
        assert_eq!(json["max_range_value"], "128545.50");
        assert_eq!(json["max_daily_volume"], 12);
    }
}
