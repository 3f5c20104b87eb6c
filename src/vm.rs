//! Multipass instance lifecycle.
//!
//! Launch, start, info, and mount via the `multipass` CLI. These commands
//! always run on the host (the tool only exists there), so everything here
//! takes the concrete `LocalRunner`. `multipass info --format json` is the
//! source of truth for instance state; each mutating action checks it first.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::host::HostOs;
use crate::process;
use crate::runner::{CommandRunner, CommandSpec, LocalRunner};

/// Instance sizing for `multipass launch`.
const VM_CPUS: &str = "2";
const VM_MEMORY: &str = "4G";
const VM_DISK: &str = "20G";

/// The slice of `multipass info --format json` this tool cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceInfo {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub mounts: HashMap<String, MountEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MountEntry {
    #[serde(default)]
    pub source_path: Option<String>,
}

impl InstanceInfo {
    /// First IPv4 address, if the instance has one.
    pub fn ip(&self) -> Option<&str> {
        self.ipv4.iter().map(String::as_str).find(|ip| !ip.is_empty())
    }

    /// Whether a host directory is already mounted into the instance.
    ///
    /// Matches by target key or by source path; the output root is shared
    /// at its own absolute path, so both name the same mapping.
    pub fn has_mount(&self, dir: &Path) -> bool {
        let dir_str = dir.to_string_lossy();
        self.mounts.iter().any(|(target, entry)| {
            target.as_str() == dir_str || entry.source_path.as_deref() == Some(dir_str.as_ref())
        })
    }
}

/// Check if the Multipass CLI is on PATH.
pub fn is_installed() -> bool {
    process::tool_exists("multipass")
}

/// Install Multipass if this host needs it and doesn't have it.
pub fn ensure_installed(host: HostOs, runner: &LocalRunner) -> Result<()> {
    if is_installed() {
        println!("  multipass already installed");
        return Ok(());
    }

    match host {
        HostOs::MacOs => {
            println!("  Installing multipass via Homebrew...");
            if !process::tool_exists("brew") {
                bail!(
                    "multipass is not installed and Homebrew is unavailable.\n\
                     Install Homebrew (https://brew.sh) or Multipass \
                     (https://multipass.run) manually, then re-run setup."
                );
            }
            runner.stream(&CommandSpec::new("brew").args(["install", "multipass"]))?;
            Ok(())
        }
        _ => bail!(
            "multipass is not installed on this {} host.\n\
             Install it from https://multipass.run and re-run setup.",
            host.name()
        ),
    }
}

/// Fetch the info block for an instance, or None if it doesn't exist.
pub fn instance_info(runner: &LocalRunner, instance: &str) -> Result<Option<InstanceInfo>> {
    let spec = CommandSpec::new("multipass").args(["info", instance, "--format", "json"]);
    let result = runner.try_run(&spec)?;

    if !result.success() {
        if result.stderr.contains("does not exist") {
            return Ok(None);
        }
        bail!(
            "`multipass info {}` failed (exit code {}):\n{}",
            instance,
            result.code(),
            result.stderr_trimmed()
        );
    }

    let parsed: serde_json::Value = serde_json::from_str(&result.stdout)
        .context("Failed to parse `multipass info` JSON output")?;
    let info: InstanceInfo = serde_json::from_value(parsed["info"][instance].clone())
        .with_context(|| format!("Unexpected `multipass info` shape for '{}'", instance))?;

    Ok(Some(info))
}

/// Ensure the instance exists and is running.
pub fn ensure_running(runner: &LocalRunner, instance: &str) -> Result<()> {
    match instance_info(runner, instance)? {
        None => {
            println!("  Launching instance '{}'...", instance);
            runner.stream(&CommandSpec::new("multipass").args([
                "launch",
                "--name",
                instance,
                "--cpus",
                VM_CPUS,
                "--memory",
                VM_MEMORY,
                "--disk",
                VM_DISK,
            ]))?;
            Ok(())
        }
        Some(info) => {
            if info.state == "Running" {
                println!("  Instance '{}' already running", instance);
                return Ok(());
            }
            println!("  Starting instance '{}'...", instance);
            runner.stream(&CommandSpec::new("multipass").args(["start", instance]))?;
            Ok(())
        }
    }
}

/// Ensure a host directory is shared into the instance at the same path.
pub fn ensure_share(runner: &LocalRunner, instance: &str, dir: &Path) -> Result<()> {
    let info = instance_info(runner, instance)?
        .with_context(|| format!("Instance '{}' does not exist", instance))?;

    if info.has_mount(dir) {
        println!("  {} already shared into '{}'", dir.display(), instance);
        return Ok(());
    }

    println!("  Sharing {} into '{}'...", dir.display(), instance);
    let target = format!("{}:{}", instance, dir.display());
    runner.run(
        &CommandSpec::new("multipass")
            .arg("mount")
            .arg_path(dir)
            .arg(&target),
    )?;
    Ok(())
}

/// IPv4 address of the instance; fatal if the instance or address is absent.
pub fn require_ip(runner: &LocalRunner, instance: &str) -> Result<String> {
    let info = instance_info(runner, instance)?.with_context(|| {
        format!(
            "Instance '{}' does not exist. Run `shimbuild setup` first.",
            instance
        )
    })?;

    match info.ip() {
        Some(ip) => Ok(ip.to_string()),
        None => bail!(
            "Instance '{}' has no IPv4 address (state: {})",
            instance,
            info.state
        ),
    }
}
