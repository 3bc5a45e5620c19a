//! Application Ports (Driven)
//!
//! Interfaces the application uses to reach external systems:
//! the trade store and the directory of dump files.

mod file_source_port;
mod trade_repository_port;

pub use file_source_port::{RecordStream, SourceError, StreamError, TradeFileSource};
pub use trade_repository_port::{RepositoryError, TradeRepositoryPort};

#[cfg(test)]
pub use trade_repository_port::MockTradeRepositoryPort;
