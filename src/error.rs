//! Error types for tempstore.

use thiserror::Error;

/// Common error type for tempstore.
#[derive(Error, Debug)]
pub enum TempstoreError {
    /// Validation error for user input (oversized file, bad parameters,
    /// malformed size/config strings).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found (unknown file id, unknown session, expired or
    /// deleted file).
    #[error("{0} not found")]
    NotFound(String),

    /// Chunked upload completion attempted before all chunks are present.
    ///
    /// Carries the exact missing indices so a client can retry minimally.
    #[error("upload incomplete: {} chunk(s) missing", missing.len())]
    Incomplete {
        /// Chunk indices that have not been uploaded yet, ascending.
        missing: Vec<u32>,
    },

    /// I/O error from the storage tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata snapshot save/restore failure. Never fatal to the process.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for tempstore operations.
pub type Result<T> = std::result::Result<T, TempstoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = TempstoreError::Validation("file too large".to_string());
        assert_eq!(err.to_string(), "validation error: file too large");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = TempstoreError::NotFound("file".to_string());
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_incomplete_error_display() {
        let err = TempstoreError::Incomplete {
            missing: vec![1, 4, 7],
        };
        assert_eq!(err.to_string(), "upload incomplete: 3 chunk(s) missing");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TempstoreError = io_err.into();
        assert!(matches!(err, TempstoreError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(TempstoreError::Persistence("snapshot failed".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
