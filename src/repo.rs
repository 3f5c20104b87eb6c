//! Shim source tree acquisition.
//!
//! Clones the upstream repository (with submodules - shim vendors gnu-efi)
//! or, when a tree is already present, verifies it actually points at the
//! expected upstream before anything builds from it.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::runner::{CommandRunner, CommandSpec};

/// Check whether the source tree exists in the execution context.
pub fn source_present(runner: &dyn CommandRunner, config: &Config) -> Result<bool> {
    let spec = CommandSpec::new("git")
        .arg("-C")
        .arg_path(&config.source_root)
        .args(["rev-parse", "--is-inside-work-tree"]);
    Ok(runner.try_run(&spec)?.success())
}

/// Origin URL of the source tree.
pub fn origin_url(runner: &dyn CommandRunner, config: &Config) -> Result<String> {
    let spec = CommandSpec::new("git")
        .arg("-C")
        .arg_path(&config.source_root)
        .args(["remote", "get-url", "origin"]);
    let result = runner.run(&spec)?;
    Ok(result.stdout_trimmed().to_string())
}

/// Ensure the source tree is present and comes from the expected upstream.
///
/// Absent: clone. Present with matching origin: nothing to do. Present with
/// a different origin: fatal - the tree is not ours to build or patch.
pub fn ensure_source(runner: &dyn CommandRunner, config: &Config) -> Result<()> {
    if source_present(runner, config)? {
        let origin = origin_url(runner, config)?;
        if !same_remote(&origin, &config.upstream_url) {
            bail!(
                "Source tree at {} has origin '{}', expected '{}'.\n\
                 Refusing to patch or build an unexpected repository. \
                 Move the tree aside or point -s at the right one.",
                config.source_root.display(),
                origin,
                config.upstream_url
            );
        }
        println!("  Source tree already cloned ({})", origin);
        return Ok(());
    }

    println!("  Cloning {}...", config.upstream_url);
    runner.stream(
        &CommandSpec::new("git")
            .args(["clone", "--recurse-submodules"])
            .arg(&config.upstream_url)
            .arg_path(&config.source_root),
    )?;
    Ok(())
}

/// Compare two git remote URLs, ignoring a trailing slash or `.git`.
pub fn same_remote(a: &str, b: &str) -> bool {
    normalize_remote(a) == normalize_remote(b)
}

fn normalize_remote(url: &str) -> &str {
    let url = url.trim().trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url)
}
