//! Infrastructure Layer - Adapters and process plumbing.
//!
//! Concrete implementations of the application ports, plus the pieces the
//! binaries need to run.

/// Environment configuration.
pub mod config;

/// Dump file discovery and record streaming.
pub mod files;

/// Metrics REST endpoint.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Trade stores (SQLite, in-memory).
pub mod persistence;

/// OS signal handling.
pub mod shutdown;

/// Tracing subscriber setup.
pub mod telemetry;
