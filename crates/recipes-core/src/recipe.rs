//! Recipe discovery.
//!
//! A recipe is any immediate subdirectory of an ecosystem root. Files next to
//! the recipe directories are ignored, and recipes are returned in
//! lexicographic order so repeated runs over the same tree build in the same
//! sequence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// A buildable recipe directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeEntry {
    /// Ecosystem the recipe belongs to (e.g. `chall-manager`).
    pub ecosystem: String,
    /// Recipe name, the directory's file name.
    pub name: String,
    /// Path of the recipe directory.
    pub directory: PathBuf,
}

impl RecipeEntry {
    /// Creates a new recipe entry.
    #[must_use]
    pub fn new(
        ecosystem: impl Into<String>,
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            name: name.into(),
            directory: directory.into(),
        }
    }

    /// Returns the file name of the compressed OCI archive for a release.
    ///
    /// Format: `<ecosystem>_<name>_<version>.oci.tar.gz`
    ///
    /// # Examples
    ///
    /// ```
    /// use recipes_core::RecipeEntry;
    ///
    /// let recipe = RecipeEntry::new("chall-manager", "k8s.EMP", "chall-manager/k8s.EMP");
    /// assert_eq!(
    ///     recipe.archive_file_name("v1.0.0"),
    ///     "chall-manager_k8s.EMP_v1.0.0.oci.tar.gz"
    /// );
    /// ```
    #[must_use]
    pub fn archive_file_name(&self, version: &str) -> String {
        format!("{}_{}_{version}.oci.tar.gz", self.ecosystem, self.name)
    }

    /// Returns the registry repository name for this recipe.
    ///
    /// Repository names must be lowercase in OCI references, so the recipe
    /// name is lowercased.
    ///
    /// # Examples
    ///
    /// ```
    /// use recipes_core::RecipeEntry;
    ///
    /// let recipe = RecipeEntry::new("chall-manager", "k8s.EMP", "chall-manager/k8s.EMP");
    /// assert_eq!(recipe.repository_name(), "recipes_chall-manager_k8s.emp");
    /// ```
    #[must_use]
    pub fn repository_name(&self) -> String {
        format!("recipes_{}_{}", self.ecosystem, self.name).to_lowercase()
    }
}

/// Lists the recipes of a single ecosystem root.
///
/// # Errors
///
/// Returns [`Error::Discovery`] if the root cannot be listed.
pub fn discover_ecosystem(root: &Path, ecosystem: &str) -> Result<Vec<RecipeEntry>> {
    let discovery_err = |source| Error::Discovery {
        path: root.to_path_buf(),
        source,
    };

    let mut recipes = Vec::new();
    for entry in fs::read_dir(root).map_err(discovery_err)? {
        let entry = entry.map_err(discovery_err)?;
        if !entry.file_type().map_err(discovery_err)?.is_dir() {
            debug!(path = ?entry.path(), "Skipping non-directory entry");
            continue;
        }
        recipes.push(RecipeEntry::new(
            ecosystem,
            entry.file_name().to_string_lossy(),
            entry.path(),
        ));
    }

    recipes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(recipes)
}

/// Lists the recipes of every ecosystem, each ecosystem name being a root
/// directory under `source_root`.
///
/// Ecosystems are visited in the given order.
///
/// # Errors
///
/// Returns [`Error::Discovery`] for the first root that cannot be listed.
pub fn discover<S: AsRef<str>>(
    source_root: &Path,
    ecosystems: &[S],
) -> Result<Vec<RecipeEntry>> {
    let mut recipes = Vec::new();
    for ecosystem in ecosystems {
        let ecosystem = ecosystem.as_ref();
        recipes.extend(discover_ecosystem(&source_root.join(ecosystem), ecosystem)?);
    }
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_skips_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("README.md"), "recipes").unwrap();

        let recipes = discover_ecosystem(dir.path(), "chall-manager").unwrap();

        let names: Vec<_> = recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(recipes[0].directory, dir.path().join("a"));
        assert_eq!(recipes[0].ecosystem, "chall-manager");
    }

    #[test]
    fn test_discover_visits_ecosystems_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("zeta").join("x")).unwrap();
        fs::create_dir_all(dir.path().join("alpha").join("y")).unwrap();

        let recipes = discover(dir.path(), &["zeta", "alpha"]).unwrap();

        let found: Vec<_> = recipes
            .iter()
            .map(|r| (r.ecosystem.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(found, [("zeta", "x"), ("alpha", "y")]);
        assert_eq!(recipes[1].directory, dir.path().join("alpha").join("y"));

        let err = discover(dir.path(), &["zeta", "missing"]).unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_ecosystem(&dir.path().join("missing"), "eco").unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[test]
    fn test_archive_file_name() {
        let recipe = RecipeEntry::new("chall-manager", "debug", "chall-manager/debug");
        assert_eq!(
            recipe.archive_file_name("v0.2.0"),
            "chall-manager_debug_v0.2.0.oci.tar.gz"
        );
    }

    #[test]
    fn test_repository_name_is_lowercase() {
        let recipe = RecipeEntry::new(
            "chall-manager",
            "kubernetes.ExposedMonopod",
            "chall-manager/kubernetes.ExposedMonopod",
        );
        assert_eq!(
            recipe.repository_name(),
            "recipes_chall-manager_kubernetes.exposedmonopod"
        );
    }
}
