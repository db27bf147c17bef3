//! Error types for recipes core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An ecosystem root could not be listed.
    #[error("cannot list ecosystem root {path}")]
    Discovery {
        /// Ecosystem root directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The CI output channel is not configured.
    #[error("CI output path is not set")]
    MissingOutputPath,

    /// The CI output channel could not be opened or written.
    #[error("writing CI output {path}")]
    Output {
        /// Output file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error at {path}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A layout directory is missing or malformed.
    #[error("invalid OCI layout at {path}: {message}")]
    InvalidLayout {
        /// Layout path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A digest is not a well-formed `sha256:<hex>` string.
    #[error("invalid digest: {digest}")]
    InvalidDigest {
        /// The rejected digest.
        digest: String,
    },

    /// Content does not match its descriptor.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Digest from the descriptor.
        expected: String,
        /// Digest of the actual content.
        actual: String,
    },

    /// A reference does not resolve to any manifest.
    #[error("reference not found: {reference}")]
    NotFound {
        /// Tag or digest.
        reference: String,
    },

    /// Serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_discovery() {
        let err = Error::Discovery {
            path: PathBuf::from("chall-manager"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        };
        assert_eq!(err.to_string(), "cannot list ecosystem root chall-manager");
        assert_eq!(
            std::error::Error::source(&err).unwrap().to_string(),
            "no such directory"
        );
    }

    #[test]
    fn test_error_display_missing_output() {
        assert_eq!(Error::MissingOutputPath.to_string(), "CI output path is not set");
    }
}
