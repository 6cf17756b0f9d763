//! Integration tests for the zkit binary.
//!
//! These tests exercise the compiled binary using assert_cmd. Each test runs
//! inside its own project directory with the user config directory pointed
//! at an empty location.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

/// A `zkit` command running in `dir` with no user-level config
fn zkit_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("zkit"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".no-user-config"))
        .env("NO_COLOR", "1")
        .env_remove("ZKIT_NETWORK")
        .env_remove("ZKIT_CONFIG")
        .env_remove("ZKIT_LOG");
    cmd
}

fn project(config: &str) -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("zkit.toml"), config).unwrap();
    dir
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_output() {
    let dir = tempdir().unwrap();
    zkit_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run project tasks"))
        .stdout(predicate::str::contains("Dotted task names may be written"));
}

#[test]
fn test_short_help_uses_summary() {
    let dir = tempdir().unwrap();
    zkit_cmd(dir.path())
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("run project tasks"))
        .stdout(predicate::str::contains("Dotted task names may be written").not());
}

#[test]
fn test_version_output() {
    let dir = tempdir().unwrap();
    zkit_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zkit"));
}

// ============================================================================
// Task Listing
// ============================================================================

#[test]
fn test_no_task_lists_tasks() {
    let dir = project("");
    zkit_cmd(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("network: local"))
        .stdout(predicate::str::contains("networks"))
        .stdout(predicate::str::contains("node.start"))
        .stdout(predicate::str::contains("Remove the artifacts directory"));
}

#[test]
fn test_config_found_from_subdirectory() {
    let dir = project("");
    let nested = dir.path().join("contracts").join("counter");
    fs::create_dir_all(&nested).unwrap();

    zkit_cmd(&nested)
        .assert()
        .success()
        .stdout(predicate::str::contains("node.status"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempdir().unwrap();
    zkit_cmd(dir.path())
        .arg("networks")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration not found"));
}

// ============================================================================
// Running Tasks
// ============================================================================

#[test]
fn test_networks_prints_json() {
    let dir = project(
        r#"
[networks.devnet]
node_url = "https://rpc.devnet.example.org"
"#,
    );
    let output = zkit_cmd(dir.path())
        .args(["--network", "devnet", "networks"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let networks: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let selected: Vec<&str> = networks
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["selected"] == true)
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert_eq!(selected, vec!["devnet"]);
}

#[test]
fn test_explicit_config_path() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("other.toml"), "default_network = \"local\"\n").unwrap();

    zkit_cmd(dir.path())
        .args(["--config", "other.toml", "networks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"local\""));
}

#[test]
fn test_unknown_task_exit_code() {
    let dir = project("");
    zkit_cmd(dir.path())
        .arg("deploy")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("task 'deploy' not found"));
}

#[test]
fn test_unknown_default_network_exit_code() {
    let dir = project("default_network = \"ghost\"\n");
    zkit_cmd(dir.path())
        .arg("networks")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("default_network"));
}

#[test]
fn test_unknown_network_option_exit_code() {
    let dir = project("");
    zkit_cmd(dir.path())
        .args(["--network", "ghost", "networks"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_network_from_environment() {
    let dir = project("");
    zkit_cmd(dir.path())
        .env("ZKIT_NETWORK", "ghost")
        .arg("networks")
        .assert()
        .code(2);
}

#[test]
fn test_malformed_toml_exit_code() {
    let dir = project("plugins = [\n");
    zkit_cmd(dir.path()).arg("networks").assert().code(2);
}

#[test]
fn test_unknown_plugin_exit_code() {
    let dir = project("plugins = [\"ghost\"]\n");
    zkit_cmd(dir.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unknown extension 'ghost'"));
}

#[test]
fn test_repeated_option_is_usage_error() {
    let dir = project("");
    zkit_cmd(dir.path())
        .args(["networks", "--to", "a", "--to", "b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("given more than once"));
}

#[test]
fn test_node_start_refuses_remote_network() {
    let dir = project(
        r#"
[networks.devnet]
node_url = "https://rpc.devnet.example.org"
"#,
    );
    zkit_cmd(dir.path())
        .args(["--network", "devnet", "node", "start"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("task 'node.start' failed"));
}

#[cfg(unix)]
mod command_tasks {
    use super::*;

    #[test]
    fn test_command_task_receives_options() {
        let dir = project(
            r#"
[tasks.deploy]
command = "sh"
args = ["-c", "echo deploying ${CONTRACT} to ${NETWORK}"]
"#,
        );
        let output = zkit_cmd(dir.path())
            .args(["deploy", "--contract", "counter"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(
            report["stdout"].as_str().unwrap().trim(),
            "deploying counter to local"
        );
    }

    #[test]
    fn test_dependency_chain_reported_on_stderr() {
        let dir = project(
            r#"
[tasks.compile]
command = "true"

[tasks.deploy]
command = "true"
depends_on = ["compile"]
"#,
        );
        zkit_cmd(dir.path())
            .arg("deploy")
            .assert()
            .success()
            .stderr(predicate::str::contains("compile -> deploy"));
    }

    #[test]
    fn test_failing_command_exit_code() {
        let dir = project(
            r#"
[tasks.broken]
command = "sh"
args = ["-c", "echo 'no such contract' >&2; exit 7"]
"#,
        );
        zkit_cmd(dir.path())
            .arg("broken")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("no such contract"));
    }
}
