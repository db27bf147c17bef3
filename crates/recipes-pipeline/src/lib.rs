//! # Recipes Pipeline
//!
//! Orchestrates the recipe build: discovery, compilation, OCI layout
//! packing, archiving and either publication or CI advertisement.
//!
//! ## Example
//!
//! ```rust,no_run
//! use recipes_compiler::GoToolchain;
//! use recipes_core::CiOutput;
//! use recipes_pipeline::{Mode, Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(PipelineConfig::new("v1.0.0"), GoToolchain::new());
//!     let entries = pipeline.run(&Mode::Advertise(CiOutput::from_env()?)).await?;
//!     println!("built {} recipes", entries.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{PipelineConfig, DEFAULT_DIST_DIR, DEFAULT_ECOSYSTEM};
pub use error::{PipelineError, Result, StepError};
pub use pipeline::{Mode, Pipeline};
