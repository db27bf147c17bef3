//! Toolchain invocation.
//!
//! A [`Toolchain`] turns a recipe directory into a single executable named
//! `main` inside that directory. [`GoToolchain`] runs `go build` with a
//! pinned module proxy and cgo disabled, so identical sources produce
//! identical static binaries.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::CompileError;

/// Module proxy pinned for reproducible builds.
pub const GOPROXY: &str = "https://proxy.golang.org,direct";

/// Name of the executable produced in each recipe directory.
pub const BINARY_NAME: &str = "main";

/// Compiles a recipe directory into its executable.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compiles the recipe in `dir`.
    ///
    /// Dropping the returned future aborts the build.
    async fn compile(&self, dir: &Path) -> Result<(), CompileError>;
}

/// `go build` toolchain.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    program: PathBuf,
    goos: Option<String>,
    goarch: Option<String>,
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self {
            program: PathBuf::from("go"),
            goos: None,
            goarch: None,
        }
    }
}

impl GoToolchain {
    /// Creates a toolchain using `go` from `PATH` for the host platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific `go` executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Cross-compiles for the given platform.
    #[must_use]
    pub fn with_target(mut self, goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        self.goos = Some(goos.into());
        self.goarch = Some(goarch.into());
        self
    }

    fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["build", "-o", BINARY_NAME, "main.go"])
            .current_dir(dir)
            .env("GOPROXY", GOPROXY)
            .env("CGO_ENABLED", "0")
            .kill_on_drop(true);
        if let Some(goos) = &self.goos {
            cmd.env("GOOS", goos);
        }
        if let Some(goarch) = &self.goarch {
            cmd.env("GOARCH", goarch);
        }
        cmd
    }
}

#[async_trait]
impl Toolchain for GoToolchain {
    async fn compile(&self, dir: &Path) -> Result<(), CompileError> {
        info!(dir = %dir.display(), "Compiling recipe");

        let output = self
            .command(dir)
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                program: self.program.display().to_string(),
                dir: dir.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(CompileError::Failed {
                dir: dir.to_path_buf(),
                status: output.status,
                output: combined,
            });
        }

        debug!(dir = %dir.display(), "Compilation succeeded");
        Ok(())
    }
}
