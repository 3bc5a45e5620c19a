//! Shared Domain Types
//!
//! Value objects and errors shared across the trade and metrics contexts.

pub mod errors;
pub mod ticker;

pub use errors::DomainError;
pub use ticker::Ticker;
