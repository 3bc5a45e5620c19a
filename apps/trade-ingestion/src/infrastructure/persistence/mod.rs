//! Persistence Adapters
//!
//! Implementations of `TradeRepositoryPort`.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryTradeRepository;
pub use sqlite::SqliteTradeRepository;
