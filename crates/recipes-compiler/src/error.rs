//! Error types for recipe compilation, packing and archiving.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised while invoking the toolchain.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The toolchain could not be started.
    #[error("failed to run {program} in {dir}")]
    Spawn {
        /// Toolchain executable.
        program: String,
        /// Recipe directory.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The toolchain exited unsuccessfully.
    #[error("compilation of {dir} failed ({status}), output: {output}")]
    Failed {
        /// Recipe directory.
        dir: PathBuf,
        /// Exit status of the toolchain.
        status: ExitStatus,
        /// Combined stdout and stderr.
        output: String,
    },
}

/// Errors raised while building an OCI layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// I/O error on the content store or layout.
    #[error("I/O error at {path}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file expected in the recipe directory is missing.
    #[error("missing {name} in {dir}")]
    MissingFile {
        /// File name.
        name: String,
        /// Recipe directory.
        dir: PathBuf,
    },

    /// The project descriptor could not be parsed or written back.
    #[error("project descriptor {path}: {message}")]
    Descriptor {
        /// Descriptor path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A reference is not known to the content store.
    #[error("reference {reference} not found in content store")]
    NotFound {
        /// Tag or digest.
        reference: String,
    },

    /// Manifest serialization failed.
    #[error("packing manifest")]
    Pack(#[from] serde_json::Error),

    /// Layout directory error.
    #[error(transparent)]
    Layout(#[from] recipes_core::Error),
}

/// Errors raised while archiving a layout.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error while creating, writing or closing the archive.
    #[error("creating tar.gz {path}")]
    Io {
        /// Path of the file being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The layout directory could not be walked.
    #[error("walking {path}")]
    Walk {
        /// Layout directory.
        path: PathBuf,
        /// Underlying walk error.
        #[source]
        source: walkdir::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_display() {
        let err = LayoutError::MissingFile {
            name: "main".to_string(),
            dir: PathBuf::from("chall-manager/debug"),
        };
        assert_eq!(err.to_string(), "missing main in chall-manager/debug");
    }

    #[test]
    fn test_spawn_display() {
        let err = CompileError::Spawn {
            program: "go".to_string(),
            dir: PathBuf::from("chall-manager/debug"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "failed to run go in chall-manager/debug");
    }
}
