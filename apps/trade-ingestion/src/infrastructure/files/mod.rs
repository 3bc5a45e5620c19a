//! Dump file adapter.
//!
//! Lists a directory for files with the configured extension and streams
//! their `;`-delimited records with the `csv` reader.

mod discovery;
mod reader;

use std::path::{Path, PathBuf};

use crate::application::ports::{RecordStream, SourceError, TradeFileSource};

pub use discovery::list_files;
pub use reader::CsvRecordStream;

/// Extension of B3 trade dumps.
pub const DEFAULT_EXTENSION: &str = "txt";

/// Field delimiter of B3 trade dumps.
pub const DEFAULT_DELIMITER: u8 = b';';

/// File source over a local directory of delimited dumps.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    extension: String,
    delimiter: u8,
}

impl Default for CsvFileSource {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION, DEFAULT_DELIMITER)
    }
}

impl CsvFileSource {
    /// Source for files ending in `.{extension}`, split on `delimiter`.
    ///
    /// A leading dot on `extension` is ignored.
    #[must_use]
    pub fn new(extension: impl Into<String>, delimiter: u8) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.').to_string();
        Self {
            extension,
            delimiter,
        }
    }

    /// Recognized extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl TradeFileSource for CsvFileSource {
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        list_files(dir, &self.extension)
    }

    fn open(&self, file: &Path) -> Result<Box<dyn RecordStream>, SourceError> {
        let stream = CsvRecordStream::open(file, self.delimiter)?;
        Ok(Box::new(stream))
    }
}
