//! Error types for the extraction engine

use thiserror::Error;

/// Errors surfaced by worksheet validation and the spreadsheet sources.
///
/// Data-shape anomalies (missing header marker, unparseable cells, malformed
/// period labels) never show up here: they are skipped where they occur.
#[derive(Debug, Error)]
pub enum Error {
    /// The sheet URL does not contain a `/spreadsheets/d/<key>` segment.
    #[error("could not extract a spreadsheet key from URL: {url}")]
    InvalidReference { url: String },

    /// The spreadsheet backend rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Spreadsheet or worksheet missing, or access denied.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected failure while walking the worksheets of one spreadsheet.
    #[error("error processing worksheets in sheet {key}")]
    Worksheet {
        key: String,
        #[source]
        source: Box<Error>,
    },

    /// The configured similarity scorer cannot be used.
    #[error("fuzzy matching unavailable: {0}")]
    MatchingUnavailable(String),

    #[error("invalid cell reference: {0}")]
    CellReference(String),

    #[error("failed to read workbook: {0}")]
    Workbook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Configuration and access errors are fatal for a single teacher only.
    pub fn is_per_teacher(&self) -> bool {
        !matches!(self, Error::MatchingUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
