use std::{io, path::PathBuf};

use thiserror::Error;

/// Broad category of a failure, as the shell reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A user, book or author lookup missed
    NotFound,
    /// The operation is not valid for the book's current state
    InvalidStateTransition,
    /// A record with the same key already exists
    Duplicate,
    /// Reading or writing a data file failed
    PersistenceIo,
}

/// Failures of the flat-file store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening, reading, writing or flushing a file failed
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// The CSV reader or writer rejected a record
    #[error("failed to process {}: {source}", .path.display())]
    Csv {
        /// File being accessed
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },
    /// A line has the wrong number of fields
    #[error("{}:{line}: expected {expected} fields, found {found}", .path.display())]
    Malformed {
        /// File being loaded
        path: PathBuf,
        /// 1-based line number
        line: u64,
        /// Fields a record of this collection has
        expected: usize,
        /// Fields found on the line
        found: usize,
    },
}

/// Errors returned by catalog operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("User '{0}' not found")]
    UserNotFound(String),
    #[error("Book '{0}' not found")]
    BookNotFound(String),
    #[error("Book '{title}' is currently unavailable")]
    Unavailable { title: String },
    #[error("Book '{title}' is not borrowed")]
    NotBorrowed { title: String },
    #[error("Book '{title}' is marked unavailable but has no loan on record")]
    NoLoanRecord { title: String },
    #[error("User '{user_id}' has not borrowed '{title}'")]
    NotBorrowedByUser { user_id: String, title: String },
    #[error("{entity} '{key}' already exists")]
    AlreadyExists { entity: &'static str, key: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LibraryError {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::BookNotFound(_) => ErrorKind::NotFound,
            Self::Unavailable { .. }
            | Self::NotBorrowed { .. }
            | Self::NoLoanRecord { .. }
            | Self::NotBorrowedByUser { .. } => ErrorKind::InvalidStateTransition,
            Self::AlreadyExists { .. } => ErrorKind::Duplicate,
            Self::Store(_) => ErrorKind::PersistenceIo,
        }
    }
}

/// Errors loading the JSON configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
