//! Application Layer
//!
//! Orchestrates the domain through:
//!
//! - **Ports**: Interfaces to the trade store and the dump files
//! - **Use Cases**: Per-ticker metric computation
//! - **Pipeline**: The concurrent ingestion pipeline and its lifecycle

pub mod pipeline;
pub mod ports;
pub mod use_cases;

pub use ports::*;
pub use use_cases::*;
