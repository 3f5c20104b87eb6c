//! Clean command - `make clean` in the source tree.

use anyhow::Result;

use crate::config::Config;
use crate::runner::{CommandRunner, CommandSpec};

/// Execute the clean command. Always safe to repeat.
pub fn cmd_clean(config: &Config, runner: &dyn CommandRunner) -> Result<()> {
    println!("Cleaning shim build artifacts...");
    runner.stream(&CommandSpec::new("make").arg("clean").dir(&config.source_root))?;
    println!("Clean complete.");
    Ok(())
}
