//! Build-configuration patching for the shim source tree.
//!
//! Setup adjusts `Make.defaults` in three independent ways: debug symbols
//! in the optimizer flags, the debug-info install directory, and an export
//! of that directory for sub-makes. Each patch is probed with `grep -qF`
//! before it is applied with `sed -i`, so a patched tree is never touched
//! again. Both commands go through the runner - the file lives wherever
//! the build runs.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::runner::{CommandRunner, CommandSpec};

/// Build configuration file inside the shim source tree.
pub const BUILD_CONFIG_FILE: &str = "Make.defaults";

/// One idempotent edit to the build configuration.
///
/// `needle` is a fixed string that only exists once the patch is applied;
/// every `sed_expr` writes its own needle back out, which is what makes the
/// probe-then-apply loop converge.
pub struct ConfigPatch {
    /// Short name for progress output.
    pub name: &'static str,
    /// Fixed string probed with `grep -qF`.
    pub needle: &'static str,
    /// `sed -e` expression that applies the patch.
    pub sed_expr: &'static str,
}

/// The patch set, in application order.
pub const PATCHES: [ConfigPatch; 3] = [
    ConfigPatch {
        name: "debug symbols",
        needle: "OPTIMIZER ?= -ggdb -Og",
        sed_expr: "s|^OPTIMIZER[[:space:]]*?=.*|OPTIMIZER ?= -ggdb -Og|",
    },
    ConfigPatch {
        name: "debug directory",
        needle: "DEBUGDIR ?= /usr/lib/debug/usr/share/shim/",
        sed_expr: "s|^DEBUGDIR[[:space:]]*?=.*|DEBUGDIR ?= /usr/lib/debug/usr/share/shim/|",
    },
    ConfigPatch {
        name: "debug directory export",
        needle: "export DEBUGDIR",
        sed_expr: "$ a export DEBUGDIR",
    },
];

/// Check whether a patch is already present in the file.
pub fn is_applied(runner: &dyn CommandRunner, file: &Path, patch: &ConfigPatch) -> Result<bool> {
    let spec = CommandSpec::new("grep")
        .args(["-qF", patch.needle])
        .arg_path(file);
    Ok(runner.try_run(&spec)?.success())
}

/// Apply a patch in place.
pub fn apply(runner: &dyn CommandRunner, file: &Path, patch: &ConfigPatch) -> Result<()> {
    let spec = CommandSpec::new("sed")
        .args(["-i", "-e", patch.sed_expr])
        .arg_path(file);
    runner.run(&spec)?;
    Ok(())
}

/// Bring `Make.defaults` to its patched state, skipping anything already done.
pub fn ensure_patched(runner: &dyn CommandRunner, config: &Config) -> Result<()> {
    let file = config.source_root.join(BUILD_CONFIG_FILE);

    for patch in &PATCHES {
        if is_applied(runner, &file, patch)? {
            println!("  {} already patched", patch.name);
            continue;
        }

        println!("  Patching {}...", patch.name);
        apply(runner, &file, patch)?;

        // The edit only counts if the probe now sees it.
        if !is_applied(runner, &file, patch)? {
            bail!(
                "Patch '{}' did not take effect in {}.\n\
                 The file layout may have changed upstream.",
                patch.name,
                file.display()
            );
        }
    }

    Ok(())
}
