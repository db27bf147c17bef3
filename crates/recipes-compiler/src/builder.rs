//! OCI layout builder.
//!
//! Packs a compiled recipe into an OCI image layout:
//!
//! 1. open a [`FileStore`] on the recipe directory
//! 2. normalize the project descriptor (optional)
//! 3. add the binary and the descriptor as `application/vnd.ctfer-io.file`
//!    layers
//! 4. pack an OCI 1.1 artifact manifest of type
//!    `application/vnd.ctfer-io.scenario`
//! 5. tag the staged manifest by its own digest
//! 6. copy the content graph into a fresh layout under the recipe directory,
//!    tagged with the release version

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use recipes_core::oci::ANNOTATION_CREATED;
use recipes_core::{Descriptor, Manifest, MediaType, OciLayout};
use tracing::info;

use crate::error::LayoutError;
use crate::project::{normalize_project, DESCRIPTOR_NAME};
use crate::store::FileStore;
use crate::toolchain::BINARY_NAME;

/// Default name of the layout directory inside a recipe directory.
pub const LAYOUT_DIR: &str = "dist";

/// Options for [`LayoutBuilder`].
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Compiled binary file name.
    pub binary: String,
    /// Project descriptor file name.
    pub descriptor: String,
    /// Layout directory name, relative to the recipe directory.
    pub layout_dir: String,
    /// Whether to normalize the descriptor before packing it.
    pub normalize_descriptor: bool,
    /// Fixed creation time for the manifest annotation (defaults to now).
    pub created: Option<DateTime<Utc>>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            binary: BINARY_NAME.to_string(),
            descriptor: DESCRIPTOR_NAME.to_string(),
            layout_dir: LAYOUT_DIR.to_string(),
            normalize_descriptor: true,
            created: None,
        }
    }
}

impl LayoutOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables descriptor normalization.
    #[must_use]
    pub const fn with_normalize_descriptor(mut self, normalize: bool) -> Self {
        self.normalize_descriptor = normalize;
        self
    }

    /// Pins the manifest creation time.
    #[must_use]
    pub const fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Sets the layout directory name.
    #[must_use]
    pub fn with_layout_dir(mut self, layout_dir: impl Into<String>) -> Self {
        self.layout_dir = layout_dir.into();
        self
    }
}

/// Builds OCI layouts from compiled recipe directories.
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    options: LayoutOptions,
}

impl LayoutBuilder {
    /// Creates a builder with the given options.
    #[must_use]
    pub const fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// Returns the builder options.
    #[must_use]
    pub const fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Returns the layout directory of a recipe.
    #[must_use]
    pub fn layout_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.options.layout_dir)
    }

    /// Packs the recipe in `dir` into its layout directory and returns the
    /// manifest descriptor.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if a file is missing, the descriptor cannot
    /// be normalized, or the layout cannot be written.
    pub fn build(&self, dir: &Path, version: &str) -> Result<Descriptor, LayoutError> {
        let mut store = FileStore::new(dir)?;

        if self.options.normalize_descriptor {
            normalize_project(&dir.join(&self.options.descriptor))?;
        }

        let mut layers = Vec::with_capacity(2);
        for name in [&self.options.binary, &self.options.descriptor] {
            layers.push(store.add(name, MediaType::recipe_file())?);
        }

        let created = self.options.created.unwrap_or_else(Utc::now);
        let root = pack_manifest(&mut store, MediaType::RECIPE_SCENARIO, layers, created)?;

        store.tag(&root, &root.digest)?;

        let layout_path = self.layout_path(dir);
        let mut layout = OciLayout::create(&layout_path)?;
        store.copy_graph(&store.resolve(&root.digest)?, &layout)?;
        layout.tag(&root, version)?;

        info!(
            dir = %dir.display(),
            layout = %layout_path.display(),
            digest = %root.digest,
            version,
            "Built OCI layout"
        );
        Ok(root)
    }
}

/// Packs an artifact manifest over `layers` into `store` and returns its
/// descriptor.
///
/// # Errors
///
/// Returns [`LayoutError::Pack`] if the manifest cannot be serialized.
pub fn pack_manifest(
    store: &mut FileStore,
    artifact_type: &str,
    layers: Vec<Descriptor>,
    created: DateTime<Utc>,
) -> Result<Descriptor, LayoutError> {
    let manifest = Manifest::artifact(artifact_type, layers).with_annotation(
        ANNOTATION_CREATED,
        created.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    store.push_bytes(manifest.config.media_type.clone(), b"{}".to_vec());

    let mut desc = store.push_bytes(MediaType::oci_manifest(), serde_json::to_vec(&manifest)?);
    desc.artifact_type = Some(artifact_type.to_string());
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn recipe_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main"), b"\x7fELF binary").unwrap();
        fs::write(dir.path().join("Pulumi.yaml"), "name: debug\nruntime: go\n").unwrap();
        dir
    }

    fn fixed_options() -> LayoutOptions {
        LayoutOptions::new().with_created(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_build_layout() {
        let dir = recipe_dir();
        let builder = LayoutBuilder::new(fixed_options());

        let root = builder.build(dir.path(), "v1.0.0").unwrap();

        let layout = OciLayout::open(dir.path().join("dist")).unwrap();
        assert_eq!(layout.resolve("v1.0.0").unwrap().digest, root.digest);

        let manifest = layout.manifest(&root).unwrap();
        assert_eq!(
            manifest.artifact_type.as_deref(),
            Some(MediaType::RECIPE_SCENARIO)
        );
        assert_eq!(manifest.layers.len(), 2);
        assert!(manifest
            .layers
            .iter()
            .all(|l| l.media_type.as_str() == MediaType::RECIPE_FILE));
        for desc in manifest.references() {
            assert!(layout.contains(desc), "missing blob {}", desc.digest);
        }

        let binary = layout.fetch(manifest.layer("main").unwrap()).unwrap();
        assert_eq!(binary, b"\x7fELF binary");
        let descriptor = layout.fetch(manifest.layer("Pulumi.yaml").unwrap()).unwrap();
        assert!(String::from_utf8(descriptor).unwrap().contains("binary: ./main"));
    }

    #[test]
    fn test_build_is_deterministic_with_pinned_time() {
        let dir = recipe_dir();
        let builder = LayoutBuilder::new(fixed_options());

        let first = builder.build(dir.path(), "v1.0.0").unwrap();
        let second = builder.build(dir.path(), "v1.0.0").unwrap();
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_build_without_normalization_keeps_descriptor() {
        let dir = recipe_dir();
        let builder = LayoutBuilder::new(fixed_options().with_normalize_descriptor(false));

        builder.build(dir.path(), "v1.0.0").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("Pulumi.yaml")).unwrap(),
            "name: debug\nruntime: go\n"
        );
    }

    #[test]
    fn test_build_missing_binary() {
        let dir = recipe_dir();
        fs::remove_file(dir.path().join("main")).unwrap();

        let err = LayoutBuilder::default()
            .build(dir.path(), "v1.0.0")
            .unwrap_err();
        assert!(matches!(err, LayoutError::MissingFile { ref name, .. } if name == "main"));
    }
}
