//! Error types for spaceanalyzer

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for spaceanalyzer operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(String),

    /// The file is not a paged database file
    #[error("{path}: not a database file: {reason}")]
    NotADatabase {
        /// File that failed the preflight check
        path: PathBuf,
        /// What was wrong with it
        reason: Cow<'static, str>,
    },

    /// The database header carries a value outside the legal range
    #[error("Invalid header field {field}: {value}")]
    InvalidHeader {
        /// Header field name
        field: &'static str,
        /// Offending raw value
        value: u32,
    },

    /// The storage engine cannot produce page geometry records
    #[error("Page statistics unavailable: {0}")]
    StatUnavailable(Cow<'static, str>),

    /// Error reported by the storage engine
    #[error("Storage engine error: {0}")]
    Sqlite(String),

    /// Selector named an object that is not in the catalog
    #[error("Unknown table or index: {0}")]
    UnknownObject(String),

    /// A page record carried an unrecognised page type
    #[error("Invalid page type: {0}")]
    InvalidPageType(String),

    /// An index list entry carried an unrecognised origin
    #[error("Invalid index origin: {0}")]
    InvalidIndexOrigin(String),

    /// The configured catalog name is also the name of a real object
    #[error("Catalog name {0:?} collides with a table or index of the same name")]
    CatalogNameCollision(String),

    /// Custom error
    #[error("{0}")]
    Custom(Cow<'static, str>),
}

/// Result type alias for spaceanalyzer operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(err.to_string())
    }
}

/// Page number within the database file (1-based, 0 means "none")
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageNumber(pub u64);

impl PageNumber {
    /// Whether this page immediately follows `prev`
    pub fn follows(self, prev: PageNumber) -> bool {
        prev.0.checked_add(1) == Some(self.0)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error {
    /// Whether the error means the file could not be analysed at all
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::NotADatabase { .. }
                | Error::InvalidHeader { .. }
                | Error::StatUnavailable(_)
                | Error::Sqlite(_)
        )
    }
}
