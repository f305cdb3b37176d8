//! CSV input source
//!
//! Reads the input file, normalizes the header row (trim + lowercase)
//! and enforces the one required column: `isbn`. Everything else is
//! carried through as opaque strings.

use crate::ImportResult;
use mcat_common::Error;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// CSV file opened for import, headers already validated
#[derive(Debug)]
pub struct CsvSource {
    headers: Vec<String>,
    reader: csv::Reader<File>,
}

impl CsvSource {
    /// Open an input file and validate its header row.
    ///
    /// Fails when the file cannot be read or when no case-insensitive
    /// `isbn` column is present.
    pub fn open(path: &Path) -> ImportResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        if !headers.iter().any(|h| h == "isbn") {
            return Err(Error::InvalidInput(format!(
                "required column 'isbn' not found in header of {}",
                path.display()
            ))
            .into());
        }

        info!("Parsing CSV file: {}", path.display());

        Ok(Self { headers, reader })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Iterate data rows as normalized-header -> cell mappings
    pub fn rows(self) -> CsvRows {
        CsvRows {
            headers: self.headers,
            inner: self.reader.into_records(),
        }
    }
}

/// Row iterator for a [`CsvSource`]
pub struct CsvRows {
    headers: Vec<String>,
    inner: csv::StringRecordsIntoIter<File>,
}

impl Iterator for CsvRows {
    type Item = ImportResult<HashMap<String, String>>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.inner.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(err.into())),
        };

        // Short rows simply leave trailing columns absent
        let fields = self
            .headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();

        Some(Ok(fields))
    }
}
