//! Shared test utilities for shimbuild tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shimbuild::config::{Config, DEFAULT_UPSTREAM_URL};

/// Unpatched Make.defaults fragment, shaped like the upstream file the
/// patch set operates on.
pub const MAKE_DEFAULTS_FIXTURE: &str = "\
COMPILER\t?= gcc
CC\t\t= $(CROSS_COMPILE)$(COMPILER)
OPTIMIZER\t?= -O2
DEBUGDIR\t?= $(libdir)/debug/usr/share/shim/
DEFAULT_LOADER\t?= \\\\grubx64.efi
";

/// Test environment with a fixture source tree and output directories.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Fixture shim source tree (contains Make.defaults)
    pub source_root: PathBuf,
    /// Install destination
    pub install_root: PathBuf,
    /// Mock ESP directory
    pub esp: PathBuf,
    /// Base directory (project root simulation)
    pub base_dir: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with temporary directories.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let source_root = base.join("shim");
        let install_root = base.join("out/install");
        let esp = base.join("esp");
        let base_dir = base.to_path_buf();

        fs::create_dir_all(&source_root).expect("Failed to create source dir");
        fs::create_dir_all(&install_root).expect("Failed to create install dir");
        fs::create_dir_all(&esp).expect("Failed to create esp dir");

        fs::write(source_root.join("Make.defaults"), MAKE_DEFAULTS_FIXTURE)
            .expect("Failed to write Make.defaults fixture");

        Self {
            _temp_dir: temp_dir,
            source_root,
            install_root,
            esp,
            base_dir,
        }
    }

    /// Path to the fixture build configuration file.
    pub fn make_defaults(&self) -> PathBuf {
        self.source_root.join("Make.defaults")
    }

    /// A config pointing all roots into this environment.
    pub fn config(&self) -> Config {
        Config {
            output_root: self.base_dir.join("out"),
            source_root: self.source_root.clone(),
            instance: "shim-builder-test".to_string(),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            mount_point: self.base_dir.join("guest"),
            echo: false,
        }
    }
}

/// Create a mock build artifact file, creating parent directories.
pub fn create_mock_artifact(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir for artifact");
    }
    fs::write(path, b"not a real PE binary").expect("Failed to create mock artifact");
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}
