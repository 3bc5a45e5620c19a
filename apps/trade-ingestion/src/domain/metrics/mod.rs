//! Per-ticker aggregation over stored trades.
//!
//! Prices are compared as exact decimals, so `150.00` and `150.000` are
//! the same value and never displace each other as the maximum.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::trade::TradeInfo;

/// Result of aggregating one ticker's trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickerMetrics {
    /// Highest execution price, zero when there are no trades.
    pub max_price: Decimal,
    /// Largest quantity traded on a single session date, zero when there
    /// are no trades.
    pub max_daily_volume: i64,
}

impl TickerMetrics {
    /// Aggregate a result set.
    #[must_use]
    pub fn from_trades(trades: &[TradeInfo]) -> Self {
        Self {
            max_price: max_price(trades),
            max_daily_volume: max_daily_volume(trades),
        }
    }
}

/// Maximum price across `trades`, or zero for an empty set.
///
/// The fold starts at zero, so a set of only negative prices also yields
/// zero.
#[must_use]
pub fn max_price(trades: &[TradeInfo]) -> Decimal {
    trades
        .iter()
        .map(|t| t.price)
        .fold(Decimal::ZERO, |max, price| if price > max { price } else { max })
}

/// Sum quantities per session date and return the largest daily sum, or
/// zero for an empty set.
#[must_use]
pub fn max_daily_volume(trades: &[TradeInfo]) -> i64 {
    let mut per_day: HashMap<NaiveDate, i64> = HashMap::new();
    for trade in trades {
        let total = per_day.entry(trade.date).or_insert(0);
        *total = total.saturating_add(trade.quantity);
    }
    per_day.into_values().fold(0, i64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Ticker;
    use std::str::FromStr;

    fn info(price: &str, quantity: i64, date: (i32, u32, u32)) -> TradeInfo {
        TradeInfo {
            ticker: Ticker::parse("AAPL").unwrap(),
            price: Decimal::from_str(price).unwrap(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            quantity,
        }
    }

    #[test]
    fn same_day_trades_sum_into_one_volume() {
        let trades = vec![
            info("100.00", 200, (2025, 6, 8)),
            info("150.00", 300, (2025, 6, 8)),
        ];
        let metrics = TickerMetrics::from_trades(&trades);
        assert_eq!(metrics.max_price, Decimal::from_str("150.00").unwrap());
        assert_eq!(metrics.max_daily_volume, 500);
    }

    #[test]
    fn volume_is_per_day_not_total() {
        let trades = vec![
            info("10", 100, (2025, 6, 2)),
            info("10", 400, (2025, 6, 3)),
        ];
        assert_eq!(max_daily_volume(&trades), 400);
    }

    #[test]
    fn equal_prices_with_different_scale_do_not_replace_maximum() {
        let trades = vec![info("150.00", 1, (2025, 6, 8)), info("150.000", 1, (2025, 6, 8))];
        let max = max_price(&trades);
        assert_eq!(max, Decimal::from_str("150").unwrap());
        // The first occurrence wins, so the scale of the first row is kept.
        assert_eq!(max.to_string(), "150.00");
    }

    #[test]
    fn empty_set_yields_zeroes() {
        let metrics = TickerMetrics::from_trades(&[]);
        assert_eq!(metrics, TickerMetrics::default());
        assert!(metrics.max_price.is_zero());
        assert_eq!(metrics.max_daily_volume, 0);
    }

    #[test]
    fn exact_comparison_beyond_float_precision() {
        let trades = vec![
            info("0.30000000000000001", 1, (2025, 6, 8)),
            info("0.3", 1, (2025, 6, 8)),
        ];
        assert_eq!(
            max_price(&trades),
            Decimal::from_str("0.30000000000000001").unwrap()
        );
    }

    #[test]
    fn negative_quantities_reduce_daily_volume() {
        let trades = vec![info("1", 500, (2025, 6, 2)), info("1", -200, (2025, 6, 2))];
        assert_eq!(max_daily_volume(&trades), 300);
    }

    #[test]
    fn all_negative_prices_report_zero() {
        let trades = vec![info("-1.5", 1, (2025, 6, 8)), info("-0.25", 1, (2025, 6, 8))];
        assert_eq!(max_price(&trades), Decimal::ZERO);
        assert_eq!(
            max_price(&[info("-3", 1, (2025, 6, 8)), info("2.5", 1, (2025, 6, 8))]),
            Decimal::from_str("2.5").unwrap()
        );
    }
}
