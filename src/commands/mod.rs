//! CLI command handlers.
//!
//! Each submodule handles one operation:
//! - `setup` - idempotent environment bootstrap
//! - `clean` - remove build artifacts
//! - `make` - build shim
//! - `install` - install artifacts, optionally copy to an ESP
//! - `mount` - surface the VM source tree on the host

pub mod clean;
pub mod install;
pub mod make;
pub mod mount;
pub mod setup;

pub use clean::cmd_clean;
pub use install::cmd_install;
pub use make::cmd_make;
pub use mount::cmd_mount;
pub use setup::cmd_setup;
