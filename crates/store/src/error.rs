//! Error types for the storage engine.

use std::io;

use snafu::Snafu;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// I/O error from the underlying storage backend.
    #[snafu(display("I/O error: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Stored data is corrupted or has an invalid format.
    #[snafu(display("Corrupted data: {reason}"))]
    Corrupted {
        /// Description of what was corrupted.
        reason: String,
    },

    /// Invalid column family identifier.
    #[snafu(display("Invalid column family: {id}"))]
    InvalidColumnFamily {
        /// The invalid column family id.
        id: u8,
    },
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        let display = format!("{err}");
        assert!(display.starts_with("I/O error:"), "got: {display}");
    }

    #[test]
    fn test_error_display_corrupted() {
        let err = Error::Corrupted { reason: "truncated log data".to_string() };
        assert_eq!(format!("{err}"), "Corrupted data: truncated log data");
    }

    #[test]
    fn test_error_display_invalid_column_family() {
        let err = Error::InvalidColumnFamily { id: 7 };
        assert_eq!(format!("{err}"), "Invalid column family: 7");
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as StdError;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(err.source().is_some(), "Error::Io should have a source");
    }
}
