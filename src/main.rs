//! shimbuild - build orchestrator for the shim UEFI bootloader.
//!
//! Builds shim natively on a Linux host, or inside a Multipass VM on macOS
//! and Windows hosts, then installs the resulting binaries to an EFI
//! System Partition.
//!
//! One invocation at a time: there is no lock, and concurrent runs against
//! the same instance or source tree will race each other.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shimbuild::commands;
use shimbuild::config::{Config, Overrides};
use shimbuild::host::{self, ExecutionContext};
use shimbuild::runner::{self, LocalRunner};

#[derive(Parser)]
#[command(name = "shimbuild")]
#[command(about = "Build orchestrator for the shim UEFI bootloader")]
#[command(
    after_help = "QUICK START:\n  shimbuild setup    Prepare VM, sources, and toolchain\n  shimbuild make     Build shim\n  shimbuild install  Install artifacts to the output root\n  shimbuild mount    See the VM source tree from the host"
)]
struct Cli {
    /// Output root override
    #[arg(short = 'r', long = "output-root", value_name = "PATH")]
    output_root: Option<PathBuf>,

    /// Source root override
    #[arg(short = 's', long = "source-root", value_name = "PATH")]
    source_root: Option<PathBuf>,

    /// Print each external command before running it
    #[arg(long)]
    echo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the build environment (VM, source tree, build config, toolchain)
    Setup,

    /// Remove build artifacts from the source tree
    Clean,

    /// Build shim, forwarding extra make variables verbatim
    Make {
        /// Variables and flags passed through to make (e.g. VENDOR_CERT_FILE=cert.der)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Install built artifacts, optionally copying them onto an ESP
    Install {
        /// EFI System Partition directory to copy .efi files into
        esp: Option<PathBuf>,
    },

    /// Surface the VM's source tree on the host via sshfs
    Mount {
        /// Mount point (default: ~/shim-build/guest)
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    let host_os = host::detect().context("Could not determine the host platform")?;
    let context = ExecutionContext::for_host(host_os);

    let overrides = Overrides {
        output_root: cli.output_root,
        source_root: cli.source_root,
        echo: cli.echo,
    };
    let config = Config::load(context, &overrides)?;

    let host_runner = LocalRunner::new(config.echo);
    let target_runner = runner::for_context(context, &config);

    match cli.command {
        Commands::Setup => {
            commands::cmd_setup(host_os, context, &config, target_runner.as_ref(), &host_runner)?;
        }
        Commands::Clean => {
            commands::cmd_clean(&config, target_runner.as_ref())?;
        }
        Commands::Make { args } => {
            commands::cmd_make(&config, target_runner.as_ref(), &args)?;
        }
        Commands::Install { esp } => {
            commands::cmd_install(&config, target_runner.as_ref(), esp.as_deref())?;
        }
        Commands::Mount { path } => {
            commands::cmd_mount(host_os, &host_runner, &config, path)?;
        }
    }

    Ok(())
}
