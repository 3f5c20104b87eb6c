//! Reverse mount: surface the guest's source tree on the host.
//!
//! The build happens inside the VM, so editors and debuggers on the host
//! can't see the tree. `shimbuild mount` bridges that with sshfs against
//! the instance's IP. Preconditions are checked up front; a failed mount
//! attempt is followed by a best-effort unmount so a half-attached FUSE
//! endpoint doesn't linger.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::host::HostOs;
use crate::process;
use crate::runner::{CommandRunner, CommandSpec, LocalRunner};
use crate::vm;

/// User inside the Multipass instance.
const GUEST_USER: &str = "ubuntu";

/// Mount the guest source tree at `target` on the host.
pub fn mount_guest_source(
    host: HostOs,
    runner: &LocalRunner,
    config: &Config,
    target: &Path,
) -> Result<()> {
    if !process::tool_exists("sshfs") {
        match host {
            HostOs::MacOs => bail!(
                "sshfs is not installed. Install it with `brew install macfuse sshfs`."
            ),
            _ => bail!(
                "sshfs is not installed. Install the sshfs package and re-run mount."
            ),
        }
    }

    fs::create_dir_all(target)
        .with_context(|| format!("Failed to create mount point {}", target.display()))?;

    if !dir_is_empty(target)? {
        bail!(
            "Mount point {} is not empty. Refusing to mount over existing files.",
            target.display()
        );
    }

    if currently_mounted(target)? {
        bail!("{} is already mounted", target.display());
    }

    let ip = vm::require_ip(runner, &config.instance)?;
    let remote = format!("{}@{}:{}", GUEST_USER, ip, config.source_root.display());

    println!("Mounting {} at {}...", remote, target.display());
    let spec = CommandSpec::new("sshfs")
        .arg(&remote)
        .arg_path(target)
        .args(["-o", "reconnect"]);

    let result = runner.try_run(&spec)?;
    if !result.success() {
        // Clean up whatever half-state sshfs left behind before reporting.
        let _ = runner.try_run(&unmount_spec(host, target));
        let stderr = result.stderr_trimmed();
        if stderr.is_empty() {
            bail!("sshfs failed (exit code {})", result.code());
        } else {
            bail!("sshfs failed (exit code {}):\n{}", result.code(), stderr);
        }
    }

    println!("Mounted. Unmount with: {}", unmount_spec(host, target).render());
    Ok(())
}

/// The platform's unmount command for a FUSE mount point.
pub fn unmount_spec(host: HostOs, target: &Path) -> CommandSpec {
    match host {
        HostOs::Linux => CommandSpec::new("fusermount").arg("-u").arg_path(target),
        _ => CommandSpec::new("umount").arg_path(target),
    }
}

/// Check whether a directory has no entries.
pub fn dir_is_empty(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(entries.next().is_none())
}

/// Check the system mount table for `target`.
///
/// Linux exposes `/proc/mounts`; elsewhere the `mount` command prints the
/// table in a format the same token scan handles.
pub fn currently_mounted(target: &Path) -> Result<bool> {
    let proc_mounts = Path::new("/proc/mounts");
    let table = if proc_mounts.exists() {
        fs::read_to_string(proc_mounts).context("Failed to read /proc/mounts")?
    } else {
        process::Cmd::new("mount")
            .error_msg("Failed to read the mount table")
            .run()?
            .stdout
    };
    Ok(mount_table_contains(&table, target))
}

/// Scan mount-table text for a mount at `target`.
pub fn mount_table_contains(table: &str, target: &Path) -> bool {
    let needle = target.to_string_lossy();
    table
        .lines()
        .any(|line| line.split_whitespace().any(|token| token == needle))
}
