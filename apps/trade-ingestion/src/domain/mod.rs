//! Domain Layer
//!
//! Trade entities, the record parser, and metric computations. Nothing in
//! here performs I/O.

pub mod metrics;
pub mod shared;
pub mod trade;
