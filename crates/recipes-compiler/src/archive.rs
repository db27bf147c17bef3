//! Streaming tar+gzip archiver.
//!
//! The writer chain is `tar -> gzip -> hash tee -> file`: the SHA-256 digest
//! is computed over the compressed bytes as they reach the file, so it equals
//! the digest of the archive on disk without reading it back.
//!
//! Writers are owned by the layer above them, so they are always finished in
//! the order tar, gzip, file, including when an error unwinds the chain.

use std::fs::{self, File, FileType};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use recipes_core::HashingWriter;
use tar::{EntryType, Header, HeaderMode};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ArchiveError;

/// Kind of a walked layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file, archived with its content.
    RegularFile,
    /// Directory, archived as a header only.
    Directory,
    /// Symlink, device, socket, ...; not archived.
    Other,
}

impl EntryKind {
    /// Classifies a file type without following symlinks.
    #[must_use]
    pub fn of(file_type: FileType) -> Self {
        if file_type.is_file() {
            Self::RegularFile
        } else if file_type.is_dir() {
            Self::Directory
        } else {
            Self::Other
        }
    }
}

type ArchiveWriter = tar::Builder<GzEncoder<HashingWriter<BufWriter<File>>>>;

/// Archives the content of `layout_dir` into a tar.gz at `target` and returns
/// the hex-encoded SHA-256 of the written file.
///
/// Entry names are relative to `layout_dir`, which itself is not archived.
/// A partially written target is removed on failure.
///
/// # Errors
///
/// Returns an [`ArchiveError`] if the layout cannot be walked or read, or the
/// target cannot be written.
pub fn archive(layout_dir: &Path, target: &Path) -> Result<String, ArchiveError> {
    match write_archive(layout_dir, target) {
        Ok(digest) => {
            info!(target = %target.display(), digest = %digest, "Archived OCI layout");
            Ok(digest)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(target) {
                debug!(target = %target.display(), error = %rm, "No partial archive to remove");
            }
            Err(e)
        }
    }
}

fn write_archive(layout_dir: &Path, target: &Path) -> Result<String, ArchiveError> {
    let to_target = |source| ArchiveError::Io {
        path: target.to_path_buf(),
        source,
    };

    let file = File::create(target).map_err(to_target)?;
    let sink = HashingWriter::new(BufWriter::new(file));
    let mut builder = tar::Builder::new(GzEncoder::new(sink, Compression::default()));

    for entry in WalkDir::new(layout_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ArchiveError::Walk {
            path: layout_dir.to_path_buf(),
            source,
        })?;
        if entry.depth() == 0 {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(layout_dir)
            .unwrap_or_else(|_| entry.path());

        match EntryKind::of(entry.file_type()) {
            EntryKind::RegularFile => append_file(&mut builder, entry.path(), rel)?,
            EntryKind::Directory => append_dir(&mut builder, entry.path(), rel)?,
            EntryKind::Other => {
                warn!(path = %entry.path().display(), "Skipping non-regular entry");
            }
        }
    }

    let gzip = builder.into_inner().map_err(to_target)?;
    let sink = gzip.finish().map_err(to_target)?;
    let (buffered, digest) = sink.finish();
    let file = buffered
        .into_inner()
        .map_err(|e| to_target(e.into_error()))?;
    file.sync_all().map_err(to_target)?;

    Ok(digest)
}

fn append_file(builder: &mut ArchiveWriter, path: &Path, rel: &Path) -> Result<(), ArchiveError> {
    let to_entry = |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(to_entry)?;
    let meta = file.metadata().map_err(to_entry)?;

    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&meta, HeaderMode::Complete);
    builder
        .append_data(&mut header, rel, file)
        .map_err(to_entry)?;

    debug!(entry = %rel.display(), size = meta.len(), "Archived file");
    Ok(())
}

fn append_dir(builder: &mut ArchiveWriter, path: &Path, rel: &Path) -> Result<(), ArchiveError> {
    let to_entry = |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(to_entry)?;

    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&meta, HeaderMode::Complete);
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);

    let name: PathBuf = rel.join("");
    builder
        .append_data(&mut header, &name, io::empty())
        .map_err(to_entry)
}
