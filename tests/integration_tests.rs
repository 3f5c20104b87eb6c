//! Integration tests for shimbuild.
//!
//! These run real host tools (git, sed, grep) against fixture trees in
//! temporary directories. Nothing here touches the network, multipass, or
//! sshfs.

mod helpers;

use std::env;
use std::fs;

use serial_test::serial;

use helpers::{assert_file_contains, assert_file_exists, create_mock_artifact, TestEnv};
use shimbuild::artifact::copy_esp_artifacts;
use shimbuild::config::{Config, Overrides};
use shimbuild::host::ExecutionContext;
use shimbuild::patch::{self, PATCHES};
use shimbuild::repo;
use shimbuild::runner::{CommandRunner, CommandSpec, LocalRunner};
use shimbuild::sshfs;

// =============================================================================
// Build-configuration patching
// =============================================================================

#[test]
fn test_patches_apply_to_fixture() {
    let env = TestEnv::new();
    let runner = LocalRunner::new(false);

    patch::ensure_patched(&runner, &env.config()).expect("patching should succeed");

    assert_file_contains(&env.make_defaults(), "OPTIMIZER ?= -ggdb -Og");
    assert_file_contains(&env.make_defaults(), "DEBUGDIR ?= /usr/lib/debug/usr/share/shim/");
    assert_file_contains(&env.make_defaults(), "export DEBUGDIR");
}

#[test]
fn test_second_setup_run_performs_zero_mutations() {
    let env = TestEnv::new();
    let runner = LocalRunner::new(false);
    let config = env.config();

    patch::ensure_patched(&runner, &config).expect("first run should succeed");
    let after_first = fs::read_to_string(env.make_defaults()).unwrap();

    patch::ensure_patched(&runner, &config).expect("second run should succeed");
    let after_second = fs::read_to_string(env.make_defaults()).unwrap();

    assert_eq!(
        after_first, after_second,
        "a second setup run must not touch already-patched configuration"
    );
}

#[test]
fn test_patch_probe_flips_after_apply() {
    let env = TestEnv::new();
    let runner = LocalRunner::new(false);
    let file = env.make_defaults();

    for p in &PATCHES {
        assert!(
            !patch::is_applied(&runner, &file, p).unwrap(),
            "'{}' should not be present in the unpatched fixture",
            p.name
        );
        patch::apply(&runner, &file, p).unwrap();
        assert!(
            patch::is_applied(&runner, &file, p).unwrap(),
            "'{}' should be detected after applying",
            p.name
        );
    }
}

#[test]
fn test_patching_preserves_unrelated_lines() {
    let env = TestEnv::new();
    let runner = LocalRunner::new(false);

    patch::ensure_patched(&runner, &env.config()).unwrap();

    assert_file_contains(&env.make_defaults(), "COMPILER\t?= gcc");
    assert_file_contains(&env.make_defaults(), "DEFAULT_LOADER\t?= \\\\grubx64.efi");
}

// =============================================================================
// Source tree acquisition
// =============================================================================

#[test]
fn test_source_probe_on_non_repo_directory() {
    let env = TestEnv::new();
    let runner = LocalRunner::new(false);

    // The fixture directory exists but is not a git work tree.
    assert!(!repo::source_present(&runner, &env.config()).unwrap());
}

#[test]
fn test_origin_verification_accepts_upstream_and_rejects_fork() {
    let env = TestEnv::new();
    let runner = LocalRunner::new(false);
    let config = env.config();

    runner
        .run(&CommandSpec::new("git").arg("init").arg_path(&env.source_root))
        .unwrap();
    runner
        .run(
            &CommandSpec::new("git")
                .arg("-C")
                .arg_path(&env.source_root)
                .args(["remote", "add", "origin", &config.upstream_url]),
        )
        .unwrap();

    assert!(repo::source_present(&runner, &config).unwrap());
    repo::ensure_source(&runner, &config).expect("matching origin should pass");

    runner
        .run(
            &CommandSpec::new("git")
                .arg("-C")
                .arg_path(&env.source_root)
                .args(["remote", "set-url", "origin", "https://github.com/fork/shim.git"]),
        )
        .unwrap();

    let err = repo::ensure_source(&runner, &config).unwrap_err();
    assert!(err.to_string().contains("expected"), "got: {}", err);
}

// =============================================================================
// ESP artifact copy
// =============================================================================

#[test]
fn test_esp_copy_picks_up_efi_binaries() {
    let env = TestEnv::new();
    create_mock_artifact(&env.install_root.join("boot/efi/EFI/shimbuild/shimx64.efi"));
    create_mock_artifact(&env.install_root.join("boot/efi/EFI/shimbuild/mmx64.efi"));
    create_mock_artifact(&env.install_root.join("usr/share/doc/shim/README"));

    let copied = copy_esp_artifacts(&env.install_root, &env.esp).unwrap();

    assert_eq!(copied, 2);
    assert_file_exists(&env.esp.join("shimx64.efi"));
    assert_file_exists(&env.esp.join("mmx64.efi"));
    assert!(!env.esp.join("README").exists());
}

#[test]
fn test_esp_copy_fails_on_missing_destination() {
    let env = TestEnv::new();
    create_mock_artifact(&env.install_root.join("shimx64.efi"));

    let missing = env.base_dir.join("no-such-esp");
    let err = copy_esp_artifacts(&env.install_root, &missing).unwrap_err();

    assert!(err.to_string().contains("does not exist"));
    assert!(!missing.exists(), "a failed copy must not create the destination");
}

#[test]
fn test_esp_copy_fails_when_nothing_was_built() {
    let env = TestEnv::new();

    let err = copy_esp_artifacts(&env.install_root, &env.esp).unwrap_err();
    assert!(err.to_string().contains("No .efi artifacts"));
}

// =============================================================================
// Mount preconditions
// =============================================================================

#[test]
fn test_mount_point_emptiness_check() {
    let env = TestEnv::new();
    let target = env.base_dir.join("guest");
    fs::create_dir_all(&target).unwrap();

    assert!(sshfs::dir_is_empty(&target).unwrap());

    fs::write(target.join("leftover"), b"x").unwrap();
    assert!(!sshfs::dir_is_empty(&target).unwrap());
}

// =============================================================================
// Configuration precedence
// =============================================================================

fn clear_shimbuild_env() {
    for key in [
        "SHIMBUILD_OUTPUT_ROOT",
        "SHIMBUILD_SOURCE_ROOT",
        "SHIMBUILD_INSTANCE",
        "SHIMBUILD_UPSTREAM_URL",
        "SHIMBUILD_MOUNT_POINT",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_config_defaults() {
    clear_shimbuild_env();

    let config = Config::load(ExecutionContext::Local, &Overrides::default()).unwrap();

    assert!(config.output_root.ends_with("shim-build/out"));
    assert!(config.source_root.ends_with("shim-build/shim"));
    assert_eq!(config.instance, "shim-builder");
    assert!(config.upstream_url.contains("rhboot/shim"));
    assert_eq!(config.install_root(), config.output_root.join("install"));
}

#[test]
#[serial]
fn test_config_remote_context_uses_guest_source_root() {
    clear_shimbuild_env();

    let config = Config::load(ExecutionContext::RemoteVm, &Overrides::default()).unwrap();

    assert_eq!(config.source_root.to_str(), Some("/home/ubuntu/shim"));
}

#[test]
#[serial]
fn test_config_env_overrides() {
    clear_shimbuild_env();
    env::set_var("SHIMBUILD_OUTPUT_ROOT", "/tmp/env-out");
    env::set_var("SHIMBUILD_INSTANCE", "other-vm");

    let config = Config::load(ExecutionContext::Local, &Overrides::default()).unwrap();

    assert_eq!(config.output_root.to_str(), Some("/tmp/env-out"));
    assert_eq!(config.instance, "other-vm");

    clear_shimbuild_env();
}

#[test]
#[serial]
fn test_config_flags_beat_environment() {
    clear_shimbuild_env();
    env::set_var("SHIMBUILD_OUTPUT_ROOT", "/tmp/env-out");

    let overrides = Overrides {
        output_root: Some("/tmp/flag-out".into()),
        source_root: None,
        echo: true,
    };
    let config = Config::load(ExecutionContext::Local, &overrides).unwrap();

    assert_eq!(config.output_root.to_str(), Some("/tmp/flag-out"));
    assert!(config.echo);

    clear_shimbuild_env();
}
