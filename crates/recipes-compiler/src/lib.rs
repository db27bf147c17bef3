//! # Recipes Compiler
//!
//! Turns a recipe directory into a distributable OCI artifact.
//!
//! This crate provides functionality for:
//!
//! - Compiling a recipe into a static binary ([`Toolchain`], [`GoToolchain`])
//! - Normalizing the project descriptor ([`normalize_project`])
//! - Packing the binary and descriptor into an OCI layout ([`LayoutBuilder`])
//! - Archiving the layout as tar.gz with a streaming digest ([`archive`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use recipes_compiler::{archive, GoToolchain, LayoutBuilder, Toolchain};
//!
//! let dir = std::path::Path::new("chall-manager/debug");
//! GoToolchain::new().compile(dir).await?;
//!
//! let builder = LayoutBuilder::default();
//! builder.build(dir, "v1.0.0")?;
//!
//! let digest = archive(&builder.layout_path(dir), "dist/debug.oci.tar.gz".as_ref())?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod builder;
pub mod error;
pub mod project;
pub mod store;
pub mod toolchain;

pub use archive::{archive, EntryKind};
pub use builder::{LayoutBuilder, LayoutOptions};
pub use error::{ArchiveError, CompileError, LayoutError};
pub use project::normalize_project;
pub use store::FileStore;
pub use toolchain::{GoToolchain, Toolchain};
