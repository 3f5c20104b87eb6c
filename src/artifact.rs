//! Installed-artifact handling.
//!
//! After `make install` populates the install root, the `.efi` binaries
//! (shim, mok manager, fallback) can be copied onto an EFI System
//! Partition. The destination must already exist - this tool does not
//! create or format ESPs.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Copy every `.efi` file under `install_root` into `esp`.
///
/// Returns the number of files copied. Zero artifacts is an error: it means
/// nothing was built, and silently "succeeding" would leave an unbootable
/// ESP.
pub fn copy_esp_artifacts(install_root: &Path, esp: &Path) -> Result<usize> {
    if !esp.is_dir() {
        bail!(
            "ESP destination {} does not exist or is not a directory",
            esp.display()
        );
    }

    let mut copied = 0;
    for entry in WalkDir::new(install_root) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_efi_binary(entry.path()) {
            continue;
        }

        let dest = esp.join(entry.file_name());
        fs::copy(entry.path(), &dest).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                entry.path().display(),
                dest.display()
            )
        })?;
        println!("  {} -> {}", entry.path().display(), dest.display());
        copied += 1;
    }

    if copied == 0 {
        bail!(
            "No .efi artifacts found under {}.\n\
             Run `shimbuild make` and `shimbuild install` first.",
            install_root.display()
        );
    }

    Ok(copied)
}

fn is_efi_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("efi"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_efi_binary() {
        assert!(is_efi_binary(Path::new("/x/shimx64.efi")));
        assert!(is_efi_binary(Path::new("/x/mmx64.EFI")));
        assert!(!is_efi_binary(Path::new("/x/shimx64.efi.debug")));
        assert!(!is_efi_binary(Path::new("/x/Makefile")));
    }
}
