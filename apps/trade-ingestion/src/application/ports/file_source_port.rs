//! Trade File Source Port (Driven Port)
//!
//! Directory listing and record streaming for dump files. Both operations
//! block on the filesystem; the parse stage calls them from blocking
//! threads only.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::trade::RawRecord;

/// Errors while listing or opening dump files.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Input directory cannot be listed.
    #[error("directory unreadable: {path}: {source}")]
    DirectoryUnreadable {
        /// Directory that was listed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File cannot be opened.
    #[error("file unreadable: {path}: {source}")]
    FileUnreadable {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors while pulling the next record from an open file.
#[derive(Debug, Error)]
pub enum StreamError {
    /// One record could not be decoded; the stream can continue.
    #[error("unreadable record at line {line}: {message}")]
    Record {
        /// Line where the record starts.
        line: u64,
        /// Decoder message.
        message: String,
    },

    /// The file itself failed; the stream is done.
    #[error("read failed at line {line}: {message}")]
    Io {
        /// Line being read when the failure happened.
        line: u64,
        /// I/O message.
        message: String,
    },
}

impl StreamError {
    /// Whether the rest of the file must be abandoned.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// A forward-only stream of raw records from one file.
pub trait RecordStream: Send {
    /// Next record, `None` at end of input.
    ///
    /// The returned record borrows the stream's buffer and is only valid
    /// until the next call.
    fn next_record(&mut self) -> Option<Result<&dyn RawRecord, StreamError>>;

    /// Line number of the most recently read record.
    fn line(&self) -> u64;
}

/// Port for discovering and opening dump files.
pub trait TradeFileSource: Send + Sync {
    /// Files in `dir` with a recognized extension, in listing order.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError>;

    /// Open `file` for streaming. The header is left for the caller.
    fn open(&self, file: &Path) -> Result<Box<dyn RecordStream>, SourceError>;
}
