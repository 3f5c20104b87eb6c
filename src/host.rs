//! Host platform detection and execution-context selection.
//!
//! Resolved once at startup, before dispatch. A Linux host builds shim
//! directly; macOS and Windows hosts delegate every source-tree command to
//! a Multipass VM.

use crate::process::Cmd;

/// Host operating system, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
}

impl HostOs {
    /// Normalize a `uname -s` value.
    ///
    /// The Windows POSIX-emulation layers (MSYS2, Git Bash, Cygwin) each
    /// report their own kernel string; all of them collapse to `Windows`.
    pub fn from_uname(uname: &str) -> Option<Self> {
        let s = uname.trim();
        if s.eq_ignore_ascii_case("linux") {
            Some(HostOs::Linux)
        } else if s.eq_ignore_ascii_case("darwin") {
            Some(HostOs::MacOs)
        } else if s.starts_with("MINGW") || s.starts_with("MSYS") || s.starts_with("CYGWIN") {
            Some(HostOs::Windows)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HostOs::Linux => "Linux",
            HostOs::MacOs => "macOS",
            HostOs::Windows => "Windows",
        }
    }

    /// Whether shim must be built inside a VM on this host.
    pub fn needs_vm(&self) -> bool {
        !matches!(self, HostOs::Linux)
    }
}

/// Detect the host OS.
///
/// `std::env::consts::OS` covers the common cases; anything else falls back
/// to `uname -s` for the POSIX-emulation normalization.
pub fn detect() -> Option<HostOs> {
    match std::env::consts::OS {
        "linux" => Some(HostOs::Linux),
        "macos" => Some(HostOs::MacOs),
        "windows" => Some(HostOs::Windows),
        _ => {
            let result = Cmd::new("uname").arg("-s").allow_fail().run().ok()?;
            if !result.success() {
                return None;
            }
            HostOs::from_uname(result.stdout_trimmed())
        }
    }
}

/// Where an operation's source-tree commands execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Directly on this host.
    Local,
    /// Inside the Multipass instance.
    RemoteVm,
}

impl ExecutionContext {
    /// Pick the execution context for a host.
    pub fn for_host(host: HostOs) -> Self {
        if host.needs_vm() {
            ExecutionContext::RemoteVm
        } else {
            ExecutionContext::Local
        }
    }
}
