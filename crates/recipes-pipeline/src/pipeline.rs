//! Recipe build orchestration.
//!
//! Each recipe goes through compile, layout, archive and, in publish mode,
//! push, before the next one starts. The first failure aborts the run.

use std::fs;
use std::io;
use std::path::Path;

use recipes_compiler::{archive, LayoutBuilder, Toolchain};
use recipes_core::{advertise, discover, BuildEntry, CiOutput, RecipeEntry};
use recipes_registry::Publisher;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, StepError};

/// What happens to each built artifact.
pub enum Mode<'a> {
    /// Push every layout to its repository.
    Publish(Publisher<'a>),
    /// Collect the archives and advertise them on the CI output channel.
    Advertise(CiOutput),
}

impl Mode<'_> {
    /// Returns the mode name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Publish(_) => "publish",
            Self::Advertise(_) => "advertise",
        }
    }
}

/// Builds every recipe of the configured ecosystems.
#[derive(Debug)]
pub struct Pipeline<T> {
    config: PipelineConfig,
    toolchain: T,
    layout: LayoutBuilder,
}

impl<T: Toolchain> Pipeline<T> {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig, toolchain: T) -> Self {
        let layout = LayoutBuilder::new(config.layout.clone());
        Self {
            config,
            toolchain,
            layout,
        }
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the toolchain.
    #[must_use]
    pub const fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Lists the recipes to build, ecosystem by ecosystem.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Discovery`] if an ecosystem root cannot be
    /// listed.
    pub fn discover(&self) -> Result<Vec<RecipeEntry>> {
        discover(&self.config.source_root, &self.config.ecosystems)
            .map_err(PipelineError::Discovery)
    }

    /// Runs the pipeline and returns one entry per built recipe, in build
    /// order.
    ///
    /// # Errors
    ///
    /// Returns the first failure, wrapped with the recipe directory when it
    /// comes from a recipe build.
    pub async fn run(&self, mode: &Mode<'_>) -> Result<Vec<BuildEntry>> {
        self.config.validate()?;
        create_dist_dir(self.config.dist_dir())?;

        let recipes = self.discover()?;
        info!(
            recipes = recipes.len(),
            version = %self.config.version,
            mode = mode.name(),
            "Starting pipeline"
        );

        let mut entries = Vec::with_capacity(recipes.len());
        for recipe in &recipes {
            let entry = self
                .build_recipe(recipe, mode)
                .await
                .map_err(|source| PipelineError::Recipe {
                    dir: recipe.directory.clone(),
                    source,
                })?;
            entries.push(entry);
        }

        if let Mode::Advertise(output) = mode {
            advertise(output, &entries).map_err(PipelineError::Output)?;
        }

        Ok(entries)
    }

    async fn build_recipe(
        &self,
        recipe: &RecipeEntry,
        mode: &Mode<'_>,
    ) -> std::result::Result<BuildEntry, StepError> {
        let version = self.config.version.as_str();
        println!("[+] Building {}@{version}", recipe.directory.display());

        self.toolchain.compile(&recipe.directory).await?;

        let manifest = {
            let builder = self.layout.clone();
            let dir = recipe.directory.clone();
            let version = version.to_string();
            tokio::task::spawn_blocking(move || builder.build(&dir, &version)).await??
        };
        println!("    Digest: {}", manifest.digest);

        let layout_dir = self.layout.layout_path(&recipe.directory);
        let target = self
            .config
            .archive_path(&recipe.archive_file_name(version));
        let digest = {
            let layout_dir = layout_dir.clone();
            let target = target.clone();
            tokio::task::spawn_blocking(move || archive(&layout_dir, &target)).await??
        };
        println!("    Exported to {}", target.display());

        if let Mode::Publish(publisher) = mode {
            publisher
                .publish(&layout_dir, &recipe.repository_name(), version)
                .await?;
        }

        info!(
            recipe = %recipe.name,
            ecosystem = %recipe.ecosystem,
            manifest = %manifest.digest,
            archive = %target.display(),
            "Recipe built"
        );
        Ok(BuildEntry::new(target, digest))
    }
}

fn create_dist_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(PipelineError::OutputDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}
