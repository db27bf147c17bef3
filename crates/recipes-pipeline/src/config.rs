//! Pipeline configuration.

use std::path::{Path, PathBuf};

use recipes_compiler::LayoutOptions;

use crate::error::{PipelineError, Result};

/// Ecosystem built when none is configured.
pub const DEFAULT_ECOSYSTEM: &str = "chall-manager";

/// Directory receiving the archives.
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Configuration of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the ecosystem roots are relative to.
    pub source_root: PathBuf,

    /// Ecosystem root directories, built in this order.
    pub ecosystems: Vec<String>,

    /// Output directory for the compressed archives.
    pub dist_dir: PathBuf,

    /// Release version, used as tag and in archive names.
    pub version: String,

    /// Layout packing options.
    pub layout: LayoutOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            ecosystems: vec![DEFAULT_ECOSYSTEM.to_string()],
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
            version: String::new(),
            layout: LayoutOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for a release version.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Sets the directory the ecosystem roots are relative to.
    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    /// Sets the ecosystems to build.
    #[must_use]
    pub fn with_ecosystems<I, S>(mut self, ecosystems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ecosystems = ecosystems.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the archive output directory.
    #[must_use]
    pub fn with_dist_dir(mut self, dist_dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = dist_dir.into();
        self
    }

    /// Sets the layout packing options.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Returns the archive path for an archive file name.
    #[must_use]
    pub fn archive_path(&self, file_name: &str) -> PathBuf {
        self.dist_dir.join(file_name)
    }

    /// Returns the output directory.
    #[must_use]
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Checks the configuration before any build work.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Precondition`] if the version is blank or no
    /// ecosystem is configured.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(PipelineError::Precondition {
                reason: "release version is empty".to_string(),
            });
        }
        if self.ecosystems.is_empty() {
            return Err(PipelineError::Precondition {
                reason: "no ecosystem configured".to_string(),
            });
        }
        Ok(())
    }
}
