//! Build command: compiles, packs and archives every recipe, then publishes
//! the layouts or advertises the archives.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use recipes_compiler::GoToolchain;
use recipes_core::CiOutput;
use recipes_pipeline::{Mode, Pipeline, PipelineConfig};
use recipes_registry::{HubConfig, HubSession, Publisher, RegistryClient, RegistryConfig};
use tracing::info;

/// Deployment mode of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Push every artifact to the registry.
    Publish,
    /// Write archive digests to the CI output channel.
    Advertise,
}

/// Arguments for the build command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Release version, used as tag and in archive names
    #[arg(long, env = "VERSION")]
    pub release: Option<String>,

    /// What to do with the built artifacts
    #[arg(long, value_enum, default_value = "advertise")]
    pub mode: RunMode,

    /// Ecosystem root directory to build (repeatable)
    #[arg(long = "ecosystem", default_value = "chall-manager")]
    pub ecosystems: Vec<String>,

    /// Output directory for the archives
    #[arg(long, default_value = "dist")]
    pub dist: PathBuf,

    /// Registry namespace, also the hub username
    #[arg(long, env = "DOCKERHUB_USERNAME", default_value = "ctferio")]
    pub namespace: String,

    /// Hub personal access token (publish mode)
    #[arg(long, env = "DOCKERHUB_PAT", hide_env_values = true)]
    pub pat: Option<String>,

    /// CI output file (advertise mode)
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Hub API URL
    #[arg(long, default_value = "https://hub.docker.com")]
    pub hub_url: String,

    /// Registry host of the pushed references
    #[arg(long, default_value = "docker.io")]
    pub registry: String,

    /// Per-request timeout in seconds (no timeout when unset)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Target operating system of the binaries
    #[arg(long, requires = "goarch")]
    pub goos: Option<String>,

    /// Target architecture of the binaries
    #[arg(long, requires = "goos")]
    pub goarch: Option<String>,
}

impl BuildArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(self.release.as_deref().unwrap_or_default().trim())
            .with_ecosystems(self.ecosystems.iter().cloned())
            .with_dist_dir(&self.dist)
    }

    fn toolchain(&self) -> GoToolchain {
        match (&self.goos, &self.goarch) {
            (Some(goos), Some(goarch)) => GoToolchain::new().with_target(goos, goarch),
            _ => GoToolchain::new(),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Execute the build command.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let config = args.pipeline_config();
    config.validate().context("checking configuration")?;

    let pipeline = Pipeline::new(config, args.toolchain());

    match args.mode {
        RunMode::Advertise => {
            let output = output_channel(args.output.clone())?;
            let entries = pipeline.run(&Mode::Advertise(output)).await?;
            info!(count = entries.len(), "Advertised artifacts");
        }
        RunMode::Publish => {
            let pat = args.pat.as_deref().unwrap_or_default();
            let mut hub = HubConfig::new(&args.namespace).with_url(&args.hub_url);
            if let Some(timeout) = args.timeout() {
                hub = hub.with_timeout(timeout);
            }
            let session = HubSession::login(hub, &args.namespace, pat)
                .await
                .context("logging in to the hub")?;

            let mut registry = RegistryConfig::for_host(&args.registry)
                .with_namespace(&args.namespace)
                .with_auth(session.registry_auth());
            if let Some(timeout) = args.timeout() {
                registry = registry.with_timeout(timeout);
            }
            let client = RegistryClient::new(registry)?;

            let entries = pipeline
                .run(&Mode::Publish(Publisher::new(&session, &client)))
                .await?;
            info!(count = entries.len(), "Published artifacts");
        }
    }

    Ok(())
}

fn output_channel(path: Option<PathBuf>) -> Result<CiOutput> {
    match path {
        Some(path) if !path.as_os_str().is_empty() => Ok(CiOutput::new(path)),
        _ => bail!("GITHUB_OUTPUT is required in advertise mode"),
    }
}
