//! Configuration for shimbuild.
//!
//! A `Config` is built once at startup and passed explicitly to every
//! operation. Precedence: CLI flags, then environment variables (a `.env`
//! file is loaded into the environment in main), then hard defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::host::ExecutionContext;

/// Upstream repository for the shim bootloader.
pub const DEFAULT_UPSTREAM_URL: &str = "https://github.com/rhboot/shim.git";

/// Default Multipass instance name.
pub const DEFAULT_INSTANCE: &str = "shim-builder";

/// Where the source tree lives inside the Multipass instance.
const GUEST_SOURCE_ROOT: &str = "/home/ubuntu/shim";

/// Values taken from the command line, overriding everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub output_root: Option<PathBuf>,
    pub source_root: Option<PathBuf>,
    pub echo: bool,
}

/// Shimbuild configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host directory receiving build outputs; shared into the VM at the
    /// same absolute path so DESTDIR is valid in both contexts.
    pub output_root: PathBuf,
    /// Shim source tree, as a path in the execution context.
    pub source_root: PathBuf,
    /// Multipass instance name.
    pub instance: String,
    /// Expected origin URL of the source tree.
    pub upstream_url: String,
    /// Default mount point for the `mount` command.
    pub mount_point: PathBuf,
    /// Trace external commands before running them.
    pub echo: bool,
}

impl Config {
    /// Build the configuration for one invocation.
    pub fn load(context: ExecutionContext, overrides: &Overrides) -> Result<Self> {
        let base = dirs::home_dir()
            .context("Cannot determine home directory")?
            .join("shim-build");

        let output_root = overrides
            .output_root
            .clone()
            .or_else(|| path_from_env("SHIMBUILD_OUTPUT_ROOT"))
            .unwrap_or_else(|| base.join("out"));

        let source_root = overrides
            .source_root
            .clone()
            .or_else(|| path_from_env("SHIMBUILD_SOURCE_ROOT"))
            .unwrap_or_else(|| match context {
                ExecutionContext::Local => base.join("shim"),
                ExecutionContext::RemoteVm => PathBuf::from(GUEST_SOURCE_ROOT),
            });

        let instance =
            env::var("SHIMBUILD_INSTANCE").unwrap_or_else(|_| DEFAULT_INSTANCE.to_string());

        let upstream_url =
            env::var("SHIMBUILD_UPSTREAM_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());

        let mount_point =
            path_from_env("SHIMBUILD_MOUNT_POINT").unwrap_or_else(|| base.join("guest"));

        Ok(Self {
            output_root,
            source_root,
            instance,
            upstream_url,
            mount_point,
            echo: overrides.echo,
        })
    }

    /// Directory that `make install` populates (removed and recreated by
    /// the install command).
    pub fn install_root(&self) -> PathBuf {
        self.output_root.join("install")
    }

    /// Print the resolved configuration.
    pub fn print(&self) {
        println!("  Output root: {}", self.output_root.display());
        println!("  Source root: {}", self.source_root.display());
        println!("  Instance:    {}", self.instance);
        println!("  Upstream:    {}", self.upstream_url);
    }
}

fn path_from_env(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}
