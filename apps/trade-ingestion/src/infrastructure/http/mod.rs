//! HTTP/REST API adapter.
//!
//! Inbound adapter serving per-ticker metrics through
//! `ComputeTickerMetricsUseCase`.

mod controller;
mod error;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use error::ApiError;
pub use request::*;
pub use response::*;
