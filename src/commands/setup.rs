//! Setup command - idempotent environment bootstrap.
//!
//! Six steps, strictly in order, each checking external state before
//! acting: VM manager, instance, output root + share, source tree, build
//! configuration, toolchain. Any failure aborts the rest; there is no
//! rollback of completed steps.

use anyhow::{Context, Result};
use std::fs;

use crate::config::Config;
use crate::host::{ExecutionContext, HostOs};
use crate::patch;
use crate::repo;
use crate::runner::{CommandRunner, CommandSpec, LocalRunner};
use crate::vm;

/// Packages installed when the build compiler is missing.
const TOOLCHAIN_PACKAGES: [&str; 2] = ["build-essential", "git"];

/// Execute the setup command.
pub fn cmd_setup(
    host: HostOs,
    context: ExecutionContext,
    config: &Config,
    runner: &dyn CommandRunner,
    host_runner: &LocalRunner,
) -> Result<()> {
    println!("=== Shim build environment setup ===");
    config.print();
    println!();

    if context == ExecutionContext::RemoteVm {
        println!("Checking VM manager...");
        vm::ensure_installed(host, host_runner)?;

        println!("Checking instance...");
        vm::ensure_running(host_runner, &config.instance)?;
    }

    println!("Checking output root...");
    ensure_output_root(config)?;
    if context == ExecutionContext::RemoteVm {
        vm::ensure_share(host_runner, &config.instance, &config.output_root)?;
    }

    println!("Checking source tree...");
    repo::ensure_source(runner, config)?;

    println!("Checking build configuration...");
    patch::ensure_patched(runner, config)?;

    println!("Checking toolchain...");
    ensure_toolchain(runner)?;

    println!("\nSetup complete.");
    Ok(())
}

fn ensure_output_root(config: &Config) -> Result<()> {
    if config.output_root.is_dir() {
        println!("  {} already exists", config.output_root.display());
        return Ok(());
    }
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "Failed to create output root {}",
            config.output_root.display()
        )
    })?;
    println!("  Created {}", config.output_root.display());
    Ok(())
}

/// Install the build toolchain if the compiler is missing on the target.
fn ensure_toolchain(runner: &dyn CommandRunner) -> Result<()> {
    let probe = CommandSpec::new("gcc").arg("--version");
    // A spawn failure means the same thing as a non-zero exit here: no gcc.
    let present = runner
        .try_run(&probe)
        .map(|r| r.success())
        .unwrap_or(false);

    if present {
        println!("  gcc already available");
        return Ok(());
    }

    println!("  Installing build toolchain...");
    runner.stream(&CommandSpec::new("sudo").args(["apt-get", "update"]))?;
    runner.stream(
        &CommandSpec::new("sudo")
            .args(["apt-get", "install", "-y"])
            .args(TOOLCHAIN_PACKAGES),
    )?;
    Ok(())
}
