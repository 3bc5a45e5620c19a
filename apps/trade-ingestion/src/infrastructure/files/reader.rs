//! Delimited record stream over one dump file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::{ErrorKind, Reader, ReaderBuilder, StringRecord};

use crate::application::ports::{RecordStream, SourceError, StreamError};
use crate::domain::trade::RawRecord;

impl RawRecord for StringRecord {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn field(&self, index: usize) -> Option<&str> {
        self.get(index)
    }
}

/// Streams records from one file, reusing a single record buffer.
///
/// The header is returned as the first record like any other; the caller
/// decides to discard it. Rows may have differing field counts; short rows
/// are left for the parser to reject.
pub struct CsvRecordStream {
    reader: Reader<BufReader<File>>,
    record: StringRecord,
}

impl CsvRecordStream {
    /// Open `path` for reading with `delimiter` between fields.
    pub fn open(path: &Path, delimiter: u8) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::FileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(file));

        Ok(Self {
            reader,
            record: StringRecord::new(),
        })
    }
}

impl RecordStream for CsvRecordStream {
    fn next_record(&mut self) -> Option<Result<&dyn RawRecord, StreamError>> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(Ok(&self.record)),
            Ok(false) => None,
            Err(e) => {
                let line = e.position().map_or_else(|| self.line(), csv::Position::line);
                let message = e.to_string();
                match e.into_kind() {
                    ErrorKind::Io(_) => Some(Err(StreamError::Io { line, message })),
                    _ => Some(Err(StreamError::Record { line, message })),
                }
            }
        }
    }

    fn line(&self) -> u64 {
        self.record
            .position()
            .map_or_else(|| self.reader.position().line(), csv::Position::line)
    }
}
