// handle-check/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{NamedTempFile, TempDir};

/// Sites that all point at a closed local port, so scans stay offline.
const OFFLINE_CATALOG: &str = r#"{
    "$schema": "data.schema.json",
    "Alpha": {
        "url": "http://127.0.0.1:1/alpha/{}",
        "urlMain": "http://127.0.0.1:1/",
        "errorType": "status_code"
    },
    "Beta": {
        "url": "http://127.0.0.1:1/beta/{}",
        "errorType": "message",
        "errorMsg": "No such user"
    },
    "Gamma": {
        "url": "http://127.0.0.1:1/gamma/{}",
        "errorType": "response_url"
    }
}"#;

/// Helper to create a test catalog file
fn create_catalog_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

/// Command isolated from the user's config files and HC_* variables.
fn handle_check(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("handle-check").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG");
    for key in [
        "HC_CONCURRENCY",
        "HC_TIMEOUT",
        "HC_MODE",
        "HC_FAST_LIMIT",
        "HC_CATALOG",
        "HC_PROGRESS_EVERY",
        "HC_CONFIG",
        "HC_JSON",
        "HC_CSV",
        "HC_PRETTY",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn test_help_shows_flags() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("USERNAME"))
        .stdout(predicate::str::contains("--catalog"))
        .stdout(predicate::str::contains("--progress-every"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_username_fails() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("username"));
}

#[test]
fn test_invalid_concurrency_fails() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .args(["bob", "-c", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Concurrency must be between 1 and 100"));
}

#[test]
fn test_huge_timeout_is_rejected() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    for timeout in ["18446744073709551615s", "307445734561825861m"] {
        handle_check(&home)
            .args(["bob", "--timeout", timeout, "--catalog"])
            .arg(catalog.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid timeout"));
    }
}

#[test]
fn test_conflicting_output_formats_fail() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .args(["bob", "--json", "--csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple output formats"));
}

#[test]
fn test_missing_catalog_fails() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .arg("bob")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No site catalog given"));
}

#[test]
fn test_unreadable_catalog_fails() {
    let home = TempDir::new().unwrap();
    handle_check(&home)
        .args(["bob", "--catalog", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("catalog"));
}

#[test]
fn test_catalog_without_usable_entries_fails() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(r#"{"Broken": {"url": "https://x.test/nothing"}}"#);

    handle_check(&home)
        .args(["bob", "--catalog"])
        .arg(catalog.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable site descriptors"));
}

#[test]
fn test_dry_run_lists_profile_urls() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--dry-run", "--mode", "full", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3 sites would be checked"))
        .stdout(predicate::str::contains("http://127.0.0.1:1/alpha/bob"))
        .stdout(predicate::str::contains("http://127.0.0.1:1/gamma/bob"));
}

#[test]
fn test_fast_limit_restricts_dry_run() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--dry-run", "--fast-limit", "2", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 sites would be checked"))
        .stdout(predicate::str::contains("Beta"))
        .stdout(predicate::str::contains("Gamma").not());
}

#[test]
fn test_catalog_from_config_file() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);
    let config = create_catalog_file(&format!(
        "[defaults]\ncatalog = \"{}\"\nmode = \"full\"\n",
        catalog.path().display()
    ));

    handle_check(&home)
        .args(["bob", "--dry-run", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3 sites would be checked"));
}

#[test]
fn test_catalog_from_environment() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--dry-run"])
        .env("HC_CATALOG", catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Alpha"));
}

#[test]
fn test_unreachable_sites_report_no_accounts() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--timeout", "2s", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No accounts found for 'bob'"));
}

#[test]
fn test_json_output_is_empty_array() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--json", "--timeout", "2s", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_csv_output_has_header() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--csv", "--timeout", "2s", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("site,url,elapsed_ms\n"));
}

#[test]
fn test_pretty_output_has_summary() {
    let home = TempDir::new().unwrap();
    let catalog = create_catalog_file(OFFLINE_CATALOG);

    handle_check(&home)
        .args(["bob", "--pretty", "--timeout", "2s", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3 sites"))
        .stdout(predicate::str::contains("3 errors"));
}
