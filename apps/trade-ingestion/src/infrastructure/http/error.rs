//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::response::ErrorResponse;

/// Failures surfaced by the metrics API. Store errors are collapsed into
/// [`ApiError::Internal`] and never shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Ticker missing or blank.
    #[error("invalid ticker")]
    InvalidTicker,
    /// Date present but not `YYYY-MM-DD`.
    #[error("invalid trade date, must be in format YYYY-MM-DD")]
    InvalidTradeDate,
    /// Metrics could not be computed.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidTicker | Self::InvalidTradeDate => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_request() {
        assert_eq!(ApiError::InvalidTicker.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidTradeDate.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
