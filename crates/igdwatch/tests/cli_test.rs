//! Integration tests for the `igdwatch` CLI binary.
//!
//! Every test points the binary at a config file inside a temporary
//! directory so the user's real configuration is never read.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const VALID: &str = r#"
local_ip = "192.168.1.10"
default_scan_interval = 60

[[entries]]
entry_id = "router"
udn = "uuid:udn123"
st = "urn:schemas-upnp-org:device:InternetGatewayDevice:1"
hostname = "192.168.1.1"

[[entries]]
entry_id = "fast"
udn = "uuid:udn456"
st = "urn:schemas-upnp-org:device:InternetGatewayDevice:2"
scan_interval = 5
"#;

fn igdwatch_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("igdwatch");
    cmd.arg("--config")
        .arg(config)
        .env("HOME", "/tmp/igdwatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/igdwatch-cli-test-nonexistent")
        .env_remove("IGDWATCH_CONFIG_FILE")
        .env_remove("IGDWATCH_LOCAL_IP")
        .env_remove("IGDWATCH_DISCOVERY_TIMEOUT")
        .env_remove("IGDWATCH_DEFAULT_SCAN_INTERVAL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = cargo_bin_cmd!("igdwatch").output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "Expected 'Usage' in output:\n{stderr}");
}

#[test]
fn test_help_lists_subcommands() {
    cargo_bin_cmd!("igdwatch").arg("--help").assert().success().stdout(
        predicate::str::contains("config")
            .and(predicate::str::contains("entries"))
            .and(predicate::str::contains("local-ip")),
    );
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_echoes_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    igdwatch_cmd(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_missing_file_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();

    igdwatch_cmd(&dir.path().join("absent.toml"))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("discovery_timeout = 10")
                .and(predicate::str::contains("default_scan_interval = 30")),
        );
}

#[test]
fn test_config_check_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, VALID);

    igdwatch_cmd(&path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration OK: 2 entries"));
}

#[test]
fn test_config_check_rejects_bad_local_ip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "local_ip = \"not-an-ip\"\n");

    igdwatch_cmd(&path)
        .args(["config", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("local_ip"));
}

#[test]
fn test_config_check_rejects_zero_scan_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[[entries]]
entry_id = "router"
udn = "uuid:udn123"
st = "urn:schemas-upnp-org:device:InternetGatewayDevice:1"
scan_interval = 0
"#,
    );

    igdwatch_cmd(&path)
        .args(["config", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("scan_interval"));
}

#[test]
fn test_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, VALID);

    igdwatch_cmd(&path)
        .env("IGDWATCH_DISCOVERY_TIMEOUT", "3")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("discovery_timeout = 3"));
}

// ── entries ─────────────────────────────────────────────────────────

#[test]
fn test_entries_list_plain() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, VALID);

    igdwatch_cmd(&path)
        .args(["entries", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(
                "uuid:udn123::urn:schemas-upnp-org:device:InternetGatewayDevice:1",
            )
            .and(predicate::str::contains("every 60s"))
            .and(predicate::str::contains("every 5s")),
        );
}

#[test]
fn test_entries_list_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, VALID);

    let output = igdwatch_cmd(&path)
        .args(["entries", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["entry_id"], "router");
    assert_eq!(rows[0]["scan_interval_secs"], 60);
    assert_eq!(rows[0]["discovery_timeout_secs"], 10);
    assert_eq!(rows[1]["scan_interval_secs"], 5);
}

#[test]
fn test_entries_list_empty() {
    let dir = tempfile::tempdir().unwrap();

    igdwatch_cmd(&dir.path().join("absent.toml"))
        .args(["entries", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no entries configured"));
}

// ── local-ip ────────────────────────────────────────────────────────

#[test]
fn test_local_ip_uses_configured_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, VALID);

    igdwatch_cmd(&path)
        .arg("local-ip")
        .assert()
        .success()
        .stdout(predicate::str::diff("192.168.1.10\n"));
}
