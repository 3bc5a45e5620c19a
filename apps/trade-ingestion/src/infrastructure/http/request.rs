//! HTTP request DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::domain::shared::Ticker;

/// Date format accepted in `trade_date`.
pub const TRADE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Query string of `GET /trades`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradesQuery {
    /// Instrument symbol. Required.
    #[serde(default)]
    pub ticker: Option<String>,
    /// Optional `YYYY-MM-DD` filter. Empty means unset.
    #[serde(default)]
    pub trade_date: Option<String>,
}

impl TradesQuery {
    /// Validate into a ticker and optional date.
    ///
    /// A blank `trade_date` counts as absent.
    pub fn validate(&self) -> Result<(Ticker, Option<NaiveDate>), ApiError> {
        let ticker = self
            .ticker
            .as_deref()
            .ok_or(ApiError::InvalidTicker)
            .and_then(|raw| Ticker::parse(raw).map_err(|_| ApiError::InvalidTicker))?;

        let date = match self.trade_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, TRADE_DATE_FORMAT)
                    .map_err(|_| ApiError::InvalidTradeDate)?,
            ),
        };

        Ok((ticker, date))
    }
}
