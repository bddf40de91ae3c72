//! Integration tests for eeu
//!
//! These tests drive the built binary against real Earth Engine and Cloud
//! Storage services.
//!
//! Run with:
//! ```bash
//! export TEST_EE_PROJECT=my-cloud-project
//! export TEST_EE_ROOT=projects/my-cloud-project/assets/eeu-tests
//! export GOOGLE_APPLICATION_CREDENTIALS=/path/to/service-account.json
//! export GCS_HMAC_ACCESS_KEY=GOOG1...
//! export GCS_HMAC_SECRET=...
//! # Optional, enables the upload/download round trip
//! export TEST_GEOTIFF=/path/to/small.tif
//!
//! cargo test --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the eeu binary
fn eeu_binary() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_eeu") {
        return PathBuf::from(path);
    }

    let target = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("target");

    let debug = target.join("debug/eeu");
    if debug.exists() {
        return debug;
    }
    target.join("release/eeu")
}

/// Run eeu with an isolated config directory
fn run_eeu(args: &[&str], config_dir: &Path) -> Output {
    Command::new(eeu_binary())
        .args(args)
        .env("EEU_CONFIG_DIR", config_dir)
        .env_remove("EEU_PROFILE")
        .output()
        .expect("Failed to execute eeu command")
}

/// Project and test root from the environment
fn get_test_config() -> Option<(String, String)> {
    let project = std::env::var("TEST_EE_PROJECT").ok()?;
    let root = std::env::var("TEST_EE_ROOT").ok()?;
    std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok()?;
    Some((project, root))
}

/// Generate unique suffix for test resources
fn uuid_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:x}", duration.as_nanos() % 0xFFFFFFFF)
}

/// Test helper: create a profile rooted in a fresh folder
fn setup_profile() -> Option<(TempDir, String)> {
    let (project, root) = get_test_config()?;
    let config_dir = tempfile::tempdir().ok()?;
    let folder = format!("{root}/run-{}", uuid_suffix());

    let output = run_eeu(
        &[
            "profile",
            "set",
            "test",
            "--project",
            &project,
            "--root",
            &folder,
            "--default",
        ],
        config_dir.path(),
    );
    if !output.status.success() {
        eprintln!(
            "Failed to set profile: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return None;
    }

    let output = run_eeu(&["mkdir", "--parents", &folder], config_dir.path());
    if !output.status.success() {
        eprintln!(
            "Failed to create test folder: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return None;
    }

    Some((config_dir, folder))
}

/// Cleanup helper: remove the test folder and everything in it
fn cleanup_folder(config_dir: &Path, folder: &str) {
    let _ = run_eeu(&["rm", "--recursive", folder], config_dir);
}

fn parse_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("Invalid JSON output")
}

mod profile_operations {
    use super::*;

    #[test]
    fn test_profile_lifecycle() {
        let config_dir = tempfile::tempdir().expect("Failed to create temp dir");

        let output = run_eeu(
            &["profile", "set", "work", "--project", "my-project", "--default"],
            config_dir.path(),
        );
        assert!(output.status.success(), "Failed to set profile");

        let output = run_eeu(&["profile", "list", "--json"], config_dir.path());
        assert!(output.status.success());
        let json = parse_json(&output);
        assert_eq!(json["default"], "work");
        assert_eq!(json["profiles"][0]["project"], "my-project");

        let output = run_eeu(&["profile", "remove", "work"], config_dir.path());
        assert!(output.status.success());

        let output = run_eeu(&["profile", "remove", "work"], config_dir.path());
        assert_eq!(output.status.code(), Some(5));
    }
}

mod asset_operations {
    use super::*;

    #[test]
    fn test_missing_asset_exit_codes() {
        let Some((config_dir, folder)) = setup_profile() else {
            eprintln!("Skipping: Earth Engine test config not available");
            return;
        };

        let output = run_eeu(&["info", "does-not-exist"], config_dir.path());
        assert_eq!(output.status.code(), Some(5));

        let output = run_eeu(&["exists", "does-not-exist", "--json"], config_dir.path());
        assert_eq!(output.status.code(), Some(5));
        assert_eq!(parse_json(&output)["exists"], false);

        cleanup_folder(config_dir.path(), &folder);
    }

    #[test]
    fn test_folder_tree_copy_move_remove() {
        let Some((config_dir, folder)) = setup_profile() else {
            eprintln!("Skipping: Earth Engine test config not available");
            return;
        };
        let dir = config_dir.path();

        let output = run_eeu(&["mkdir", "--parents", "a/b", "--json"], dir);
        assert!(
            output.status.success(),
            "mkdir failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let output = run_eeu(&["mkdir", "--collection", "a/col"], dir);
        assert!(output.status.success());

        let output = run_eeu(&["ls", "a", "--json"], dir);
        let json = parse_json(&output);
        assert_eq!(json["total"], 2);

        // Non-recursive copy of a container is refused
        let output = run_eeu(&["cp", "a", "copy"], dir);
        assert!(!output.status.success());

        let output = run_eeu(&["cp", "--recursive", "a", "copy", "--json"], dir);
        assert!(output.status.success());
        let created = parse_json(&output)["created"].as_array().unwrap().len();
        assert_eq!(created, 3);

        let output = run_eeu(&["mv", "--recursive", "copy", "moved"], dir);
        assert!(output.status.success());
        let output = run_eeu(&["exists", "copy"], dir);
        assert_eq!(output.status.code(), Some(5));

        // A non-empty folder needs --recursive
        let output = run_eeu(&["rm", "moved"], dir);
        assert!(!output.status.success());
        let output = run_eeu(&["rm", "--recursive", "moved", "--json"], dir);
        assert!(output.status.success());

        cleanup_folder(dir, &folder);
    }

    #[test]
    fn test_acl_and_properties() {
        let Some((config_dir, folder)) = setup_profile() else {
            eprintln!("Skipping: Earth Engine test config not available");
            return;
        };
        let dir = config_dir.path();

        let output = run_eeu(&["mkdir", "--collection", "col"], dir);
        assert!(output.status.success());

        let output = run_eeu(&["acl", "set", "col", "public"], dir);
        assert!(output.status.success());
        let output = run_eeu(&["acl", "get", "col", "--json"], dir);
        assert_eq!(parse_json(&output)["all_users_can_read"], true);

        let output = run_eeu(&["acl", "set", "col", "private"], dir);
        assert!(output.status.success());
        let output = run_eeu(&["acl", "get", "col", "--json"], dir);
        assert_eq!(parse_json(&output)["all_users_can_read"], false);

        let output = run_eeu(&["props", "col", "--set", "source=integration"], dir);
        assert!(output.status.success());
        let output = run_eeu(&["props", "col", "--json"], dir);
        assert_eq!(parse_json(&output)["source"], "integration");

        let output = run_eeu(&["acl", "set", "col", "{not json"], dir);
        assert_eq!(output.status.code(), Some(2));

        cleanup_folder(dir, &folder);
    }
}

mod transfer_operations {
    use super::*;

    #[test]
    fn test_upload_then_download() {
        let Ok(geotiff) = std::env::var("TEST_GEOTIFF") else {
            eprintln!("Skipping: TEST_GEOTIFF not set");
            return;
        };
        let Some((config_dir, folder)) = setup_profile() else {
            eprintln!("Skipping: Earth Engine test config not available");
            return;
        };
        let dir = config_dir.path();

        let output = run_eeu(
            &[
                "upload",
                &geotiff,
                "--asset",
                "scene",
                "--date",
                "2020-01-15",
                "--json",
            ],
            dir,
        );
        assert!(
            output.status.success(),
            "upload failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(parse_json(&output)["items"][0]["completed"], true);

        let output = run_eeu(&["info", "scene", "--json"], dir);
        assert_eq!(parse_json(&output)["type"], "IMAGE");

        let downloads = tempfile::tempdir().expect("Failed to create temp dir");
        let output = run_eeu(
            &[
                "download",
                "scene",
                "--dir",
                &downloads.path().to_string_lossy(),
                "--json",
            ],
            dir,
        );
        assert!(
            output.status.success(),
            "download failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(downloads.path().join("scene.tif").exists());

        cleanup_folder(dir, &folder);
    }
}
