//! Compute Ticker Metrics Use Case
//!
//! Reads a ticker's stored trades, optionally for one session date, and
//! reduces them to the maximum price and the peak single-day volume.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::application::ports::{RepositoryError, TradeRepositoryPort};
use crate::domain::metrics::TickerMetrics;
use crate::domain::shared::Ticker;

/// Errors from metric computation.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Reading trades from the store failed.
    #[error("query failed: {0}")]
    QueryFailed(#[from] RepositoryError),
}

/// Use case for per-ticker metrics.
pub struct ComputeTickerMetricsUseCase<R>
where
    R: TradeRepositoryPort,
{
    trade_repo: Arc<R>,
}

impl<R> ComputeTickerMetricsUseCase<R>
where
    R: TradeRepositoryPort,
{
    /// Create a new `ComputeTickerMetricsUseCase`.
    pub const fn new(trade_repo: Arc<R>) -> Self {
        Self { trade_repo }
    }

    /// Compute metrics for `ticker`, over every stored date or only `date`.
    ///
    /// An empty result set yields zero price and zero volume. A store
    /// failure yields [`MetricsError::QueryFailed`] and no partial result.
    pub async fn execute(
        &self,
        ticker: &Ticker,
        date: Option<NaiveDate>,
    ) -> Result<TickerMetrics, MetricsError> {
        let trades = self.trade_repo.list_trade_info(ticker, date).await?;

        tracing::debug!(
            ticker = %ticker,
            date = ?date,
            rows = trades.len(),
            "Computing ticker metrics"
        );

        Ok(TickerMetrics::from_trades(&trades))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockTradeRepositoryPort;
    use crate::domain::trade::TradeInfo;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn info(price: &str, quantity: i64, date: NaiveDate) -> TradeInfo {
        TradeInfo {
            ticker: Ticker::parse("AAPL").unwrap(),
            price: Decimal::from_str(price).unwrap(),
            date,
            quantity,
        }
    }

    #[tokio::test]
    async fn computes_price_and_volume() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let mut repo = MockTradeRepositoryPort::new();
        repo.expect_list_trade_info()
            .with(eq(ticker.clone()), eq(Some(d(2025, 6, 8))))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    info("100.00", 200, d(2025, 6, 8)),
                    info("150.00", 300, d(2025, 6, 8)),
                ])
            });

        let use_case = ComputeTickerMetricsUseCase::new(Arc::new(repo));
        let metrics = use_case.execute(&ticker, Some(d(2025, 6, 8))).await.unwrap();

        assert_eq!(metrics.max_price, Decimal::from_str("150.00").unwrap());
        assert_eq!(metrics.max_daily_volume, 500);
    }

    #[tokio::test]
    async fn open_ended_query_passes_no_date() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let mut repo = MockTradeRepositoryPort::new();
        repo.expect_list_trade_info()
            .with(eq(ticker.clone()), eq(None))
            .returning(|_, _| {
                Ok(vec![
                    info("10", 100, d(2025, 6, 2)),
                    info("10", 400, d(2025, 6, 3)),
                ])
            });

        let use_case = ComputeTickerMetricsUseCase::new(Arc::new(repo));
        let metrics = use_case.execute(&ticker, None).await.unwrap();

        assert_eq!(metrics.max_daily_volume, 400);
    }

    #[tokio::test]
    async fn empty_result_is_zero_not_error() {
        let mut repo = MockTradeRepositoryPort::new();
        repo.expect_list_trade_info()
            .returning(|_, _| Ok(Vec::new()));

        let use_case = ComputeTickerMetricsUseCase::new(Arc::new(repo));
        let metrics = use_case
            .execute(&Ticker::parse("NONE").unwrap(), None)
            .await
            .unwrap();

        assert_eq!(metrics, TickerMetrics::default());
    }

    #[tokio::test]
    async fn store_failure_is_query_failed() {
        let mut repo = MockTradeRepositoryPort::new();
        repo.expect_list_trade_info()
            .returning(|_, _| Err(RepositoryError::Query("disk I/O error".to_string())));

        let use_case = ComputeTickerMetricsUseCase::new(Arc::new(repo));
        let result = use_case
            .execute(&Ticker::parse("AAPL").unwrap(), None)
            .await;

        assert!(matches!(result, Err(MetricsError::QueryFailed(_))));
    }
}
