//! Install command - `make install` into the output root, optional ESP copy.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::artifact;
use crate::config::Config;
use crate::repo;
use crate::runner::{CommandRunner, CommandSpec};

/// Directory name under EFI/ that installed binaries are branded with.
const EFI_BRAND_DIR: &str = "shimbuild";

/// Execute the install command.
///
/// Removes and recreates the install root, runs `make install` with the
/// destination bound to it, and - when an ESP path is given - copies the
/// `.efi` artifacts there. A missing ESP directory is fatal, never skipped.
pub fn cmd_install(config: &Config, runner: &dyn CommandRunner, esp: Option<&Path>) -> Result<()> {
    if !repo::source_present(runner, config)? {
        bail!(
            "Source tree not found at {}. Run `shimbuild setup` first.",
            config.source_root.display()
        );
    }

    let install_root = config.install_root();
    if install_root.exists() {
        println!("Removing previous install at {}...", install_root.display());
        fs::remove_dir_all(&install_root)
            .with_context(|| format!("Failed to remove {}", install_root.display()))?;
    }
    fs::create_dir_all(&install_root)
        .with_context(|| format!("Failed to create {}", install_root.display()))?;

    println!("Installing shim to {}...", install_root.display());
    runner.stream(
        &CommandSpec::new("make")
            .arg("install")
            .arg(format!("DESTDIR={}", install_root.display()))
            .arg(format!("EFIDIR={}", EFI_BRAND_DIR))
            .dir(&config.source_root),
    )?;

    if let Some(esp) = esp {
        println!("Copying artifacts to {}...", esp.display());
        let copied = artifact::copy_esp_artifacts(&install_root, esp)?;
        println!("Copied {} artifact(s).", copied);
    }

    println!("Install complete.");
    Ok(())
}
