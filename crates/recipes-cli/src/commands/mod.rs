//! CLI commands and argument parsing.

pub mod build;

use clap::{Parser, Subcommand};

/// Recipes - build and publish recipe OCI artifacts
#[derive(Parser)]
#[command(name = "recipes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build every recipe, then publish or advertise the artifacts
    Build(build::BuildArgs),

    /// Print version information
    Version,
}
