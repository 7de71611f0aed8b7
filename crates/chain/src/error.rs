//! Error types for Bloom filter chain operations.

use snafu::Snafu;

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`BloomChain`](crate::BloomChain) operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The chain does not exist.
    #[snafu(display("key not found"))]
    NotFound,

    /// A chain already exists at the key.
    #[snafu(display("the key already exists"))]
    KeyExists,

    /// A caller-supplied parameter is invalid.
    #[snafu(display("invalid argument: {message}"))]
    InvalidArgument {
        /// What was wrong with the input.
        message: String,
    },

    /// The stored metadata record failed to decode.
    #[snafu(display("corrupted bloom chain metadata: {reason}"))]
    CorruptedMetadata {
        /// What failed during decoding.
        reason: String,
    },

    /// The metadata references a filter blob that is missing or malformed.
    #[snafu(display("corrupted bloom chain: {reason}"))]
    CorruptedChain {
        /// Which blob was bad and why.
        reason: String,
    },

    /// The underlying storage engine failed.
    #[snafu(display("storage error: {source}"))]
    Storage {
        /// The engine error, surfaced unchanged.
        source: bloomchain_store::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_not_found() {
        assert_eq!(format!("{}", Error::NotFound), "key not found");
    }

    #[test]
    fn test_display_key_exists() {
        assert_eq!(format!("{}", Error::KeyExists), "the key already exists");
    }

    #[test]
    fn test_display_invalid_argument() {
        let err = Error::InvalidArgument { message: "error rate must be in (0, 1)".to_string() };
        assert_eq!(format!("{err}"), "invalid argument: error rate must be in (0, 1)");
    }

    #[test]
    fn test_display_corrupted_chain() {
        let err = Error::CorruptedChain { reason: "missing filter #2".to_string() };
        assert_eq!(format!("{err}"), "corrupted bloom chain: missing filter #2");
    }

    #[test]
    fn test_storage_error_preserves_source() {
        use std::error::Error as StdError;

        let source = bloomchain_store::Error::Corrupted { reason: "bad".to_string() };
        let err = Error::Storage { source };
        assert!(err.source().is_some());
    }
}
