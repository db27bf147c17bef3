//! Integration tests for layout packing and archiving.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use chrono::{TimeZone, Utc};
use flate2::read::GzDecoder;
use recipes_compiler::{archive, LayoutBuilder, LayoutOptions};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Creates a compiled-looking recipe directory.
fn compiled_recipe() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.go"), "package main\n").unwrap();
    fs::write(dir.path().join("main"), vec![0xAB; 64 * 1024]).unwrap();
    fs::write(
        dir.path().join("Pulumi.yaml"),
        "name: exposed-monopod\nruntime: go\ndescription: Exposed monopod\n",
    )
    .unwrap();
    dir
}

fn files_under(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap();
            (rel.to_string_lossy().into_owned(), fs::read(e.path()).unwrap())
        })
        .collect()
}

fn archived(target: &Path) -> (BTreeMap<String, Vec<u8>>, Vec<String>) {
    let mut archive = tar::Archive::new(GzDecoder::new(fs::File::open(target).unwrap()));
    let mut files = BTreeMap::new();
    let mut dirs = Vec::new();

    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = String::from_utf8(entry.path_bytes().into_owned()).unwrap();
        match entry.header().entry_type() {
            tar::EntryType::Directory => dirs.push(name),
            tar::EntryType::Regular => {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                files.insert(name, content);
            }
            other => panic!("unexpected entry type {other:?} for {name}"),
        }
    }
    (files, dirs)
}

#[test]
fn test_archive_round_trips_layout() {
    let recipe = compiled_recipe();
    let builder = LayoutBuilder::new(
        LayoutOptions::new().with_created(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
    );
    builder.build(recipe.path(), "v1.2.0").unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("chall-manager_emp_v1.2.0.oci.tar.gz");
    let layout_dir = builder.layout_path(recipe.path());
    archive(&layout_dir, &target).unwrap();

    let (files, dirs) = archived(&target);
    assert_eq!(files, files_under(&layout_dir));
    assert!(files.contains_key("oci-layout"));
    assert!(files.contains_key("index.json"));
    assert_eq!(dirs, ["blobs/", "blobs/sha256/"]);
}

#[test]
fn test_digest_matches_file_on_disk() {
    let recipe = compiled_recipe();
    let builder = LayoutBuilder::default();
    builder.build(recipe.path(), "v1.2.0").unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("artifact.oci.tar.gz");
    let digest = archive(&builder.layout_path(recipe.path()), &target).unwrap();

    let on_disk = hex::encode(Sha256::digest(fs::read(&target).unwrap()));
    assert_eq!(digest, on_disk);
    assert_eq!(digest.len(), 64);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_skipped() {
    let layout = tempfile::tempdir().unwrap();
    fs::write(layout.path().join("index.json"), "{}").unwrap();
    std::os::unix::fs::symlink(
        layout.path().join("index.json"),
        layout.path().join("alias.json"),
    )
    .unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("layout.tar.gz");
    archive(layout.path(), &target).unwrap();

    let (files, dirs) = archived(&target);
    assert_eq!(files.keys().collect::<Vec<_>>(), ["index.json"]);
    assert!(dirs.is_empty());
}

#[test]
fn test_empty_layout_produces_valid_archive() {
    let layout = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("empty.tar.gz");

    let digest = archive(layout.path(), &target).unwrap();

    let (files, dirs) = archived(&target);
    assert!(files.is_empty());
    assert!(dirs.is_empty());
    assert_eq!(digest, hex::encode(Sha256::digest(fs::read(&target).unwrap())));
}
