//! On-disk OCI image layout.
//!
//! ```text
//! <root>/
//! ├── oci-layout            {"imageLayoutVersion":"1.0.0"}
//! ├── index.json            tagged manifest descriptors
//! └── blobs/sha256/<hex>    content, named by digest
//! ```
//!
//! Every blob written through [`OciLayout::push`] is verified against its
//! descriptor before it becomes visible under its digest.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::digest::HashingWriter;
use crate::error::{Error, Result};
use crate::oci::{Descriptor, ImageIndex, ImageLayout, Manifest};

const LAYOUT_FILE: &str = "oci-layout";
const INDEX_FILE: &str = "index.json";

/// An OCI image layout directory.
#[derive(Debug)]
pub struct OciLayout {
    root: PathBuf,
    index: ImageIndex,
}

impl OciLayout {
    /// Creates a fresh layout at `root`, removing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be reset or the layout files
    /// cannot be written.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            fs::remove_dir_all(&root).map_err(|e| io_err(&root, e))?;
        }
        let blobs = root.join("blobs").join("sha256");
        fs::create_dir_all(&blobs).map_err(|e| io_err(&blobs, e))?;

        let marker = root.join(LAYOUT_FILE);
        fs::write(&marker, serde_json::to_vec(&ImageLayout::default())?)
            .map_err(|e| io_err(&marker, e))?;

        let layout = Self {
            root,
            index: ImageIndex::default(),
        };
        layout.save_index()?;
        Ok(layout)
    }

    /// Opens an existing layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if the marker or index is missing or
    /// malformed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        let marker_path = root.join(LAYOUT_FILE);
        let marker: ImageLayout = read_json(&marker_path)?;
        if marker.image_layout_version != ImageLayout::default().image_layout_version {
            return Err(Error::InvalidLayout {
                path: root,
                message: format!(
                    "unsupported layout version {}",
                    marker.image_layout_version
                ),
            });
        }

        let index = read_json(&root.join(INDEX_FILE))?;
        Ok(Self { root, index })
    }

    /// Returns the layout root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the layout index.
    #[must_use]
    pub const fn index(&self) -> &ImageIndex {
        &self.index
    }

    /// Returns the path of the blob named by `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDigest`] for anything but a `sha256:<hex>`
    /// digest.
    pub fn blob_path(&self, digest: &str) -> Result<PathBuf> {
        let hex = digest
            .strip_prefix("sha256:")
            .filter(|h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| Error::InvalidDigest {
                digest: digest.to_string(),
            })?;
        Ok(self.root.join("blobs").join("sha256").join(hex))
    }

    /// Checks whether the blob of a descriptor is present.
    #[must_use]
    pub fn contains(&self, desc: &Descriptor) -> bool {
        self.blob_path(&desc.digest).is_ok_and(|p| p.is_file())
    }

    /// Streams `content` into the blob store under `desc`.
    ///
    /// Content already present is not rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DigestMismatch`] if the content does not match the
    /// descriptor, or an I/O error.
    pub fn push(&self, desc: &Descriptor, mut content: impl Read) -> Result<()> {
        let path = self.blob_path(&desc.digest)?;
        if path.is_file() {
            debug!(digest = %desc.digest, "Blob already present");
            return Ok(());
        }

        let staging = path.with_extension("partial");
        let file = File::create(&staging).map_err(|e| io_err(&staging, e))?;
        let mut writer = HashingWriter::new(file);
        let copied = io::copy(&mut content, &mut writer);
        let size = writer.written();
        let (file, hex) = writer.finish();
        let synced = copied.and_then(|_| file.sync_all());
        drop(file);

        let verified = synced.map_err(|e| io_err(&staging, e)).and_then(|()| {
            let actual = format!("sha256:{hex}");
            if actual != desc.digest || size != desc.size {
                return Err(Error::DigestMismatch {
                    expected: desc.digest.clone(),
                    actual,
                });
            }
            Ok(())
        });
        if let Err(e) = verified {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        fs::rename(&staging, &path).map_err(|e| io_err(&path, e))?;
        debug!(digest = %desc.digest, size, "Stored blob");
        Ok(())
    }

    /// Reads and verifies the blob of a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is missing or does not match the
    /// descriptor.
    pub fn fetch(&self, desc: &Descriptor) -> Result<Vec<u8>> {
        let path = self.blob_path(&desc.digest)?;
        let content = fs::read(&path).map_err(|e| io_err(&path, e))?;
        let actual = crate::oci::sha256_digest(&content);
        if actual != desc.digest {
            return Err(Error::DigestMismatch {
                expected: desc.digest.clone(),
                actual,
            });
        }
        Ok(content)
    }

    /// Reads the manifest a descriptor points to.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is missing, corrupt, or not a manifest.
    pub fn manifest(&self, desc: &Descriptor) -> Result<Manifest> {
        Ok(serde_json::from_slice(&self.fetch(desc)?)?)
    }

    /// Binds `tag` to a manifest descriptor and persists the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be written.
    pub fn tag(&mut self, desc: &Descriptor, tag: &str) -> Result<()> {
        self.index.tag(desc, tag);
        self.save_index()
    }

    /// Resolves a tag, or a manifest digest, to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing matches.
    pub fn resolve(&self, reference: &str) -> Result<Descriptor> {
        self.index
            .find(reference)
            .or_else(|| self.index.manifests.iter().find(|d| d.digest == reference))
            .cloned()
            .ok_or_else(|| Error::NotFound {
                reference: reference.to_string(),
            })
    }

    fn save_index(&self) -> Result<()> {
        let path = self.root.join(INDEX_FILE);
        fs::write(&path, serde_json::to_vec(&self.index)?).map_err(|e| io_err(&path, e))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read(path).map_err(|e| Error::InvalidLayout {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_slice(&content).map_err(|e| Error::InvalidLayout {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn io_err(path: &Path, source: io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}
