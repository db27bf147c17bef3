//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// Credentials are missing or were rejected.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Error message.
        message: String,
    },

    /// HTTP error from registry.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Blob upload failed.
    #[error("Failed to upload blob {digest}: {message}")]
    UploadFailed {
        /// Blob digest.
        digest: String,
        /// Error message.
        message: String,
    },

    /// Manifest push failed.
    #[error("Failed to push manifest for {repository}:{tag}: {message}")]
    ManifestPushFailed {
        /// Repository name.
        repository: String,
        /// Tag.
        tag: String,
        /// Error message.
        message: String,
    },

    /// The local OCI layout cannot be read.
    #[error("Invalid OCI layout at {path}")]
    InvalidLayout {
        /// Layout path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: recipes_core::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_http() {
        let err = RegistryError::HttpError {
            status: 500,
            message: "internal".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error from registry: 500 - internal");
    }

    #[test]
    fn test_error_display_manifest_push() {
        let err = RegistryError::ManifestPushFailed {
            repository: "ctferio/recipes_chall-manager_debug".to_string(),
            tag: "v1.0.0".to_string(),
            message: "400 Bad Request".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to push manifest for ctferio/recipes_chall-manager_debug:v1.0.0: 400 Bad Request"
        );
    }

    #[test]
    fn test_error_display_auth_failed() {
        let err = RegistryError::AuthenticationFailed {
            message: "empty credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Authentication failed: empty credentials");
    }
}
