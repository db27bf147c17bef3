//! # Recipes Core
//!
//! Core types shared by the recipes build-and-publish pipeline.
//!
//! This crate provides the foundational data structures used throughout the
//! pipeline, including:
//!
//! - [`RecipeEntry`] - A buildable recipe directory under an ecosystem root
//! - [`BuildEntry`] - The (archive path, digest) pair produced by a build
//! - [`oci`] - OCI image-spec types (descriptors, manifests, index)
//! - [`OciLayout`] - An on-disk, content-addressed OCI image layout
//! - [`output`] - The CI output channel and build-result advertisement
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use recipes_core::discover;
//!
//! let recipes = discover(Path::new("."), &["chall-manager"])?;
//! for recipe in &recipes {
//!     println!("{} -> {}", recipe.directory.display(), recipe.archive_file_name("v1.0.0"));
//! }
//! # Ok::<(), recipes_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod digest;
pub mod entry;
pub mod error;
pub mod layout;
pub mod oci;
pub mod output;
pub mod recipe;

pub use digest::HashingWriter;
pub use entry::BuildEntry;
pub use error::{Error, Result};
pub use layout::OciLayout;
pub use oci::{Descriptor, ImageIndex, ImageLayout, Manifest, MediaType};
pub use output::{advertise, encode_entries, CiOutput};
pub use recipe::{discover, discover_ecosystem, RecipeEntry};
