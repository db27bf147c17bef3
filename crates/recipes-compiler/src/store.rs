//! File-backed content store.
//!
//! The store indexes named files of a recipe directory by the digest of their
//! content without copying them, and stages small generated blobs (config,
//! manifest) in memory. Its content graph is then copied into an
//! [`OciLayout`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use recipes_core::oci::ANNOTATION_TITLE;
use recipes_core::{Descriptor, HashingWriter, Manifest, MediaType, OciLayout};
use tracing::debug;

use crate::error::LayoutError;

#[derive(Debug)]
enum Content {
    File(PathBuf),
    Staged(Vec<u8>),
}

/// Content store rooted at a recipe directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    blobs: HashMap<String, Content>,
    tags: HashMap<String, Descriptor>,
}

impl FileStore {
    /// Opens a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Io`] if `root` is not a readable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, LayoutError> {
        let root = root.into();
        let meta = std::fs::metadata(&root).map_err(|source| LayoutError::Io {
            path: root.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(LayoutError::Io {
                path: root,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        Ok(Self {
            root,
            blobs: HashMap::new(),
            tags: HashMap::new(),
        })
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Adds the file `name` (relative to the root) and returns its
    /// descriptor, annotated with the file name as title.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MissingFile`] if the file does not exist, or
    /// [`LayoutError::Io`] if it cannot be read.
    pub fn add(&mut self, name: &str, media_type: MediaType) -> Result<Descriptor, LayoutError> {
        let path = self.root.join(name);
        let mut file = File::open(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LayoutError::MissingFile {
                    name: name.to_string(),
                    dir: self.root.clone(),
                }
            } else {
                LayoutError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let mut hasher = HashingWriter::new(io::sink());
        io::copy(&mut file, &mut hasher).map_err(|source| LayoutError::Io {
            path: path.clone(),
            source,
        })?;
        let size = hasher.written();
        let (_, hex) = hasher.finish();

        let desc = Descriptor::new(media_type, format!("sha256:{hex}"), size)
            .with_annotation(ANNOTATION_TITLE, name);
        debug!(name, digest = %desc.digest, size, "Added file to store");

        self.blobs.insert(desc.digest.clone(), Content::File(path));
        Ok(desc)
    }

    /// Stages in-memory content and returns its descriptor.
    pub fn push_bytes(&mut self, media_type: MediaType, content: Vec<u8>) -> Descriptor {
        let desc = Descriptor::for_bytes(media_type, &content);
        self.blobs
            .insert(desc.digest.clone(), Content::Staged(content));
        desc
    }

    /// Checks whether the store holds the content of a descriptor.
    #[must_use]
    pub fn contains(&self, desc: &Descriptor) -> bool {
        self.blobs.contains_key(&desc.digest)
    }

    /// Opens the content of a descriptor for reading.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NotFound`] for unknown content.
    pub fn fetch(&self, desc: &Descriptor) -> Result<Box<dyn Read + '_>, LayoutError> {
        match self.blobs.get(&desc.digest) {
            Some(Content::File(path)) => {
                let file = File::open(path).map_err(|source| LayoutError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(file))
            }
            Some(Content::Staged(bytes)) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(LayoutError::NotFound {
                reference: desc.digest.clone(),
            }),
        }
    }

    /// Binds `reference` to a descriptor held by the store.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NotFound`] if the content is not in the store.
    pub fn tag(&mut self, desc: &Descriptor, reference: &str) -> Result<(), LayoutError> {
        if !self.contains(desc) {
            return Err(LayoutError::NotFound {
                reference: desc.digest.clone(),
            });
        }
        self.tags.insert(reference.to_string(), desc.clone());
        Ok(())
    }

    /// Resolves a tag to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NotFound`] for unknown references.
    pub fn resolve(&self, reference: &str) -> Result<Descriptor, LayoutError> {
        self.tags
            .get(reference)
            .cloned()
            .ok_or_else(|| LayoutError::NotFound {
                reference: reference.to_string(),
            })
    }

    /// Copies the manifest and every blob it references into `dst`.
    ///
    /// Blobs are copied before the manifest, so the layout never references
    /// missing content.
    ///
    /// # Errors
    ///
    /// Returns an error if any blob is missing or cannot be written.
    pub fn copy_graph(&self, root: &Descriptor, dst: &OciLayout) -> Result<(), LayoutError> {
        let mut raw = Vec::new();
        self.fetch(root)?
            .read_to_end(&mut raw)
            .map_err(|source| LayoutError::Io {
                path: self.root.clone(),
                source,
            })?;
        let manifest: Manifest = serde_json::from_slice(&raw)?;

        for desc in manifest.references() {
            if dst.contains(desc) {
                continue;
            }
            dst.push(desc, self.fetch(desc)?)?;
        }
        dst.push(root, raw.as_slice())?;
        Ok(())
    }
}
