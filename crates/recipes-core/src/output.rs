//! CI output channel and build-result advertisement.
//!
//! Results are written as `key=value` lines appended to a file whose path is
//! provided by the CI runner (`GITHUB_OUTPUT` on GitHub Actions). The build
//! results value is a newline-joined list of base64-encoded
//! `path=<path>,digest=sha256:<hex>` records, consumed by a provenance
//! generator.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use tracing::info;

use crate::entry::BuildEntry;
use crate::error::{Error, Result};

/// Output key under which build results are advertised.
pub const HASHES_KEY: &str = "hashes";

/// Environment variable naming the CI output file.
pub const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Append-only `key=value` output file.
#[derive(Debug, Clone)]
pub struct CiOutput {
    path: PathBuf,
}

impl CiOutput {
    /// Creates an output channel writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates an output channel from the [`OUTPUT_ENV`] environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOutputPath`] if the variable is unset or blank.
    pub fn from_env() -> Result<Self> {
        match std::env::var(OUTPUT_ENV) {
            Ok(path) if !path.trim().is_empty() => Ok(Self::new(path.trim())),
            _ => Err(Error::MissingOutputPath),
        }
    }

    /// Returns the output file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a `key=value` line, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Output`] if the file cannot be opened or written.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        let output_err = |source| Error::Output {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(output_err)?;
        writeln!(file, "{key}={value}").map_err(output_err)?;
        file.flush().map_err(output_err)
    }
}

/// Encodes build entries as newline-joined base64 records.
///
/// # Examples
///
/// ```
/// use recipes_core::{encode_entries, BuildEntry};
///
/// let value = encode_entries(&[BuildEntry::new("dist/x.tar.gz", "deadbeef")]);
/// assert_eq!(value, "cGF0aD1kaXN0L3gudGFyLmd6LGRpZ2VzdD1zaGEyNTY6ZGVhZGJlZWY=");
/// ```
#[must_use]
pub fn encode_entries(entries: &[BuildEntry]) -> String {
    entries
        .iter()
        .map(|entry| base64::engine::general_purpose::STANDARD.encode(entry.record()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Advertises build results on the CI output channel under [`HASHES_KEY`].
///
/// # Errors
///
/// Returns [`Error::Output`] if the output file cannot be written.
pub fn advertise(output: &CiOutput, entries: &[BuildEntry]) -> Result<()> {
    output.write(HASHES_KEY, &encode_entries(entries))?;
    info!(count = entries.len(), path = ?output.path(), "Advertised build results");
    Ok(())
}
