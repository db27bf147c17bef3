//! Error types for the pipeline crate.

use std::path::PathBuf;

use recipes_compiler::{ArchiveError, CompileError, LayoutError};
use recipes_registry::RegistryError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// A failure of one step of a recipe build.
#[derive(Error, Debug)]
pub enum StepError {
    /// The recipe did not compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The OCI layout could not be built.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The layout could not be archived.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The artifact could not be published.
    #[error(transparent)]
    Publish(#[from] RegistryError),

    /// A blocking step was cancelled or panicked.
    #[error("build step interrupted")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A recipe failed; the run stops at the first failure.
    #[error("{}", dir.display())]
    Recipe {
        /// Recipe directory.
        dir: PathBuf,
        /// Failed step.
        #[source]
        source: StepError,
    },

    /// An ecosystem root could not be listed.
    #[error("discovering recipes")]
    Discovery(#[source] recipes_core::Error),

    /// Build results could not be advertised.
    #[error("advertising build results")]
    Output(#[source] recipes_core::Error),

    /// The output directory could not be created.
    #[error("creating output directory {path}")]
    OutputDir {
        /// Output directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A precondition of the run is not met.
    #[error("precondition failed: {reason}")]
    Precondition {
        /// What is missing.
        reason: String,
    },
}
