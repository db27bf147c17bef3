//! Build results.

use std::path::PathBuf;

/// The result of a successful recipe build.
///
/// `digest` is the hex-encoded SHA-256 of the compressed archive found at
/// `path`, without the `sha256:` algorithm prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEntry {
    /// Location of the compressed OCI archive.
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the archive bytes.
    pub digest: String,
}

impl BuildEntry {
    /// Creates a new build entry.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, digest: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
        }
    }

    /// Returns the advertisement record for this entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use recipes_core::BuildEntry;
    ///
    /// let entry = BuildEntry::new("dist/x.tar.gz", "deadbeef");
    /// assert_eq!(entry.record(), "path=dist/x.tar.gz,digest=sha256:deadbeef");
    /// ```
    #[must_use]
    pub fn record(&self) -> String {
        format!("path={},digest=sha256:{}", self.path.display(), self.digest)
    }
}
