//! CLI contract: flags, env vars, exit codes.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    Command::cargo_bin("bridge-server")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_modes() {
    Command::cargo_bin("bridge-server")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("xmlrpc"))
        .stdout(predicate::str::contains("socket"))
        .stdout(predicate::str::contains("embedded"));
}

#[test]
fn test_invalid_timeout_exits_config_error() {
    Command::cargo_bin("bridge-server")
        .unwrap()
        .env("FREECAD_TIMEOUT_MS", "0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timeout_ms"));
}

#[test]
fn test_port_collision_exits_config_error() {
    Command::cargo_bin("bridge-server")
        .unwrap()
        .env("FREECAD_XMLRPC_PORT", "9900")
        .env("FREECAD_SOCKET_PORT", "9900")
        .assert()
        .code(1);
}

#[test]
fn test_embedded_mode_without_runtime_exits_config_error() {
    Command::cargo_bin("bridge-server")
        .unwrap()
        .env("FREECAD_MODE", "embedded")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("embedded"));
}

#[test]
fn test_unknown_mode_rejected_by_clap() {
    Command::cargo_bin("bridge-server")
        .unwrap()
        .env("FREECAD_MODE", "telepathy")
        .assert()
        .failure()
        .code(2); // clap's invalid-value exit code
}

#[test]
fn test_connect_failure_exits_2() {
    // Nothing listens on this port; the retry budget must exhaust and the
    // process exit with the connect-failure code.
    Command::cargo_bin("bridge-server")
        .unwrap()
        .env("FREECAD_MODE", "xmlrpc")
        .env("FREECAD_HOST", "127.0.0.1")
        .env("FREECAD_XMLRPC_PORT", "59871")
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .code(2);
}
