//! Mount command - reverse sshfs mount of the guest source tree.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::host::HostOs;
use crate::runner::LocalRunner;
use crate::sshfs;

/// Execute the mount command.
pub fn cmd_mount(
    host: HostOs,
    host_runner: &LocalRunner,
    config: &Config,
    path: Option<PathBuf>,
) -> Result<()> {
    let target = path.unwrap_or_else(|| config.mount_point.clone());
    sshfs::mount_guest_source(host, host_runner, config, &target)
}
