//! Make command - build shim with forwarded variables.

use anyhow::Result;

use crate::config::Config;
use crate::runner::{CommandRunner, CommandSpec};

/// The loader shim chains to when no second-stage path is configured.
/// Two backslashes: make strips one, the EFI path keeps the other.
const DEFAULT_LOADER_OVERRIDE: &str = "DEFAULT_LOADER=\\\\grubx64.efi";

/// Keep development builds bootable on firmware with flaky
/// ExitBootServices event handling.
const EBS_PROTECTION_OVERRIDE: &str = "DISABLE_EBS_PROTECTION=y";

/// Build the make argument vector: forwarded variables verbatim, then the
/// two fixed overrides.
pub fn make_args(forwarded: &[String]) -> Vec<String> {
    let mut args: Vec<String> = forwarded.to_vec();
    args.push(DEFAULT_LOADER_OVERRIDE.to_string());
    args.push(EBS_PROTECTION_OVERRIDE.to_string());
    args
}

/// Execute the make command. Always safe to repeat.
pub fn cmd_make(config: &Config, runner: &dyn CommandRunner, forwarded: &[String]) -> Result<()> {
    println!("Building shim...");
    runner.stream(
        &CommandSpec::new("make")
            .args(make_args(forwarded))
            .dir(&config.source_root),
    )?;
    println!("Build complete.");
    Ok(())
}
