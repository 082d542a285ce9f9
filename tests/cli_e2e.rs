//! End-to-end CLI tests for the papergrab binary.

// `Command::cargo_bin` is deprecated in newer assert_cmd releases.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Command with an empty config directory so a user config can't leak in.
fn papergrab(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("papergrab").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Find and download past exam papers"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("papergrab"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_sites_lists_both_archives() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .arg("sites")
        .assert()
        .success()
        .stdout(predicate::str::contains("gceguide"))
        .stdout(predicate::str::contains("papacambridge"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_levels_for_named_site() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .args(["levels", "--site", "papacambridge"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IGCSE"))
        .stdout(predicate::str::contains("AS & A-Level"))
        .stdout(predicate::str::contains("O-Level"));
}

#[test]
fn test_unknown_site_fails() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .args(["levels", "--site", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown site 'nope'"));
}

#[test]
fn test_max_active_out_of_range_rejected() {
    let home = TempDir::new().unwrap();
    papergrab(&home)
        .args(["--max-active", "0", "sites"])
        .assert()
        .failure();
}

#[test]
fn test_config_file_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("papergrab");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "colour = \"blue\"\n").unwrap();

    papergrab(&home)
        .arg("sites")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_file_default_site_is_honoured() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("papergrab");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "site = \"papacambridge\"\n").unwrap();

    papergrab(&home)
        .arg("sites")
        .assert()
        .success()
        .stdout(predicate::str::contains("papacambridge").and(predicate::str::contains(
            "Papa Cambridge (default)",
        )));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_downloads_into_output_dir() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/0625_s21_qp_12.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 paper".to_vec()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let good = format!("{}/0625_s21_qp_12.pdf", mock_server.uri());
    let bad = format!("{}/gone.pdf", mock_server.uri());
    let out_path = out.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        papergrab(&home)
            .arg("-q")
            .arg("get")
            .arg(&good)
            .arg(&bad)
            .arg("-o")
            .arg(&out_path)
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("1 of 2 downloads failed"))
        .stderr(predicate::str::contains("gone.pdf"));
    assert_eq!(
        std::fs::read(out.path().join("0625_s21_qp_12.pdf")).unwrap(),
        b"%PDF-1.4 paper"
    );
    assert!(!out.path().join("gone.pdf").exists());
}
