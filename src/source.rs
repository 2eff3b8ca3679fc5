//! URL dump input
//!
//! The URL dump is a CSV file with a header row and at least a `url` column.
//! It can hold many millions of rows, so it is read as a lazy, forward-only
//! record stream and never loaded into memory as a whole.

use crate::InputError;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Name of the column holding the URL to crawl
pub const URL_COLUMN: &str = "url";

/// A single row of the URL dump; columns other than `url` are ignored
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlRow {
    pub url: String,
}

/// Forward-only stream of URL rows
pub struct UrlSource<R: Read = File> {
    rows: csv::DeserializeRecordsIntoIter<R, UrlRow>,
}

impl UrlSource<File> {
    /// Opens a URL dump and checks its header
    ///
    /// # Returns
    ///
    /// * `Ok(UrlSource)` - The file exists and has a `url` column
    /// * `Err(InputError)` - The file cannot be opened or lacks a `url` column
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }
}

impl<R: Read> UrlSource<R> {
    /// Wraps any CSV reader; `origin` is only used in error messages
    pub fn from_reader(reader: R, origin: impl Into<PathBuf>) -> Result<Self, InputError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let has_url_column = reader.headers()?.iter().any(|h| h == URL_COLUMN);
        if !has_url_column {
            return Err(InputError::MissingColumn {
                path: origin.into(),
                column: URL_COLUMN.to_string(),
            });
        }

        Ok(Self {
            rows: reader.into_deserialize(),
        })
    }
}

impl<R: Read> Iterator for UrlSource<R> {
    type Item = Result<UrlRow, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| row.map_err(InputError::from))
    }
}
