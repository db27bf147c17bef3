//! OCI image-spec types.
//!
//! This module defines the subset of the OCI image specification used to
//! package recipes: content descriptors, artifact manifests, image indexes and
//! the `oci-layout` marker file.
//!
//! Annotations are kept in a [`BTreeMap`] so serialized manifests are stable
//! and their digests reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Annotation holding a layer's file name.
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// Annotation holding a manifest's creation time.
pub const ANNOTATION_CREATED: &str = "org.opencontainers.image.created";

/// Annotation holding the tag of an index entry.
pub const ANNOTATION_REF_NAME: &str = "org.opencontainers.image.ref.name";

/// OCI media types used by recipe artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// OCI empty JSON descriptor media type (`{}` config of artifacts).
    pub const OCI_EMPTY: &'static str = "application/vnd.oci.empty.v1+json";

    /// Media type of every file packaged in a recipe artifact.
    pub const RECIPE_FILE: &'static str = "application/vnd.ctfer-io.file";

    /// Artifact type of a recipe (scenario) manifest.
    pub const RECIPE_SCENARIO: &'static str = "application/vnd.ctfer-io.scenario";

    /// Creates a new media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>) -> Self {
        Self(media_type.into())
    }

    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creates the recipe file media type.
    #[must_use]
    pub fn recipe_file() -> Self {
        Self::new(Self::RECIPE_FILE)
    }

    /// Creates the OCI manifest media type.
    #[must_use]
    pub fn oci_manifest() -> Self {
        Self::new(Self::OCI_MANIFEST)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MediaType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// Computes the `sha256:<hex>` digest of a byte slice.
///
/// # Examples
///
/// ```
/// use recipes_core::oci::sha256_digest;
///
/// assert_eq!(
///     sha256_digest(b"{}"),
///     "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
/// );
/// ```
#[must_use]
pub fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

/// OCI content descriptor.
///
/// A descriptor identifies a blob by media type, digest and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: MediaType,

    /// Digest of the targeted content.
    pub digest: String,

    /// Size in bytes of the content.
    pub size: u64,

    /// Optional artifact type (manifest descriptors only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Optional base64-encoded inline content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Optional annotations (key-value metadata).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Descriptor {
    /// Creates a new descriptor.
    #[must_use]
    pub fn new(media_type: MediaType, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type,
            digest: digest.into(),
            size,
            artifact_type: None,
            data: None,
            annotations: None,
        }
    }

    /// Creates a descriptor for in-memory content.
    #[must_use]
    pub fn for_bytes(media_type: MediaType, content: &[u8]) -> Self {
        Self::new(media_type, sha256_digest(content), content.len() as u64)
    }

    /// Returns the OCI 1.1 empty config descriptor (`{}` inlined).
    #[must_use]
    pub fn empty_config() -> Self {
        let mut desc = Self::for_bytes(MediaType::new(MediaType::OCI_EMPTY), b"{}");
        desc.data = Some("e30=".to_string());
        desc
    }

    /// Adds an annotation to the descriptor.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns an annotation value, if present.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Returns the digest algorithm (e.g., "sha256").
    #[must_use]
    pub fn digest_algorithm(&self) -> &str {
        self.digest.split(':').next().unwrap_or("sha256")
    }

    /// Returns the digest value (without algorithm prefix).
    #[must_use]
    pub fn digest_value(&self) -> &str {
        self.digest.split(':').nth(1).unwrap_or(&self.digest)
    }
}

/// OCI image manifest describing a recipe artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this manifest.
    pub media_type: MediaType,

    /// Artifact type (OCI 1.1+).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Configuration descriptor.
    pub config: Descriptor,

    /// Layers that make up the artifact.
    pub layers: Vec<Descriptor>,

    /// Optional annotations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl Manifest {
    /// Creates an OCI 1.1 artifact manifest over the given layers.
    ///
    /// The config is the empty descriptor; the artifact is identified by its
    /// `artifactType`.
    #[must_use]
    pub fn artifact(artifact_type: impl Into<String>, layers: Vec<Descriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: MediaType::oci_manifest(),
            artifact_type: Some(artifact_type.into()),
            config: Descriptor::empty_config(),
            layers,
            annotations: None,
        }
    }

    /// Adds an annotation to the manifest.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns every descriptor the manifest references (config, then layers).
    pub fn references(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::once(&self.config).chain(self.layers.iter())
    }

    /// Returns the layer holding the named file, if present.
    #[must_use]
    pub fn layer(&self, title: &str) -> Option<&Descriptor> {
        self.layers
            .iter()
            .find(|d| d.annotation(ANNOTATION_TITLE) == Some(title))
    }
}

/// OCI image index (`index.json` of a layout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,

    /// Manifests referenced by the index.
    pub manifests: Vec<Descriptor>,
}

impl Default for ImageIndex {
    fn default() -> Self {
        Self {
            schema_version: 2,
            media_type: Some(MediaType::new(MediaType::OCI_INDEX)),
            manifests: Vec::new(),
        }
    }
}

impl ImageIndex {
    /// Binds `tag` to a manifest descriptor, replacing any previous binding
    /// of the same tag.
    pub fn tag(&mut self, manifest: &Descriptor, tag: &str) {
        self.manifests
            .retain(|d| d.annotation(ANNOTATION_REF_NAME) != Some(tag));
        self.manifests
            .push(manifest.clone().with_annotation(ANNOTATION_REF_NAME, tag));
    }

    /// Finds the manifest descriptor bound to `tag`.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&Descriptor> {
        self.manifests
            .iter()
            .find(|d| d.annotation(ANNOTATION_REF_NAME) == Some(tag))
    }
}

/// Content of the `oci-layout` marker file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayout {
    /// Layout version.
    pub image_layout_version: String,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            image_layout_version: "1.0.0".to_string(),
        }
    }
}
