//! CLI integration tests

use std::process::Command;

fn predictorctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_predictorctl"))
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = predictorctl()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("predictor service"), "Should show description");
    for command in ["list", "health", "ready", "uptime", "info", "schema", "predict", "score"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = predictorctl()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("predictorctl"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = predictorctl()
        .args(["predict", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--payload"), "Should show payload option");
    assert!(stdout.contains("--file"), "Should show file option");
}

/// Test schema subcommand help
#[test]
fn test_schema_help() {
    let output = predictorctl()
        .args(["schema", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Schema help should succeed");
    assert!(stdout.contains("--score"), "Should show score option");
}

/// Test that a missing predictor name is rejected
#[test]
fn test_predict_requires_model() {
    let output = predictorctl()
        .arg("predict")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Predict without a model should fail");
}

/// Test invalid output format
#[test]
fn test_invalid_format() {
    let output = predictorctl()
        .args(["--format", "yaml", "list"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Invalid format should fail");
}

/// Test that an unreachable server produces an error rather than a panic
#[test]
fn test_unreachable_server() {
    let output = predictorctl()
        .args(["--server-url", "http://127.0.0.1:9", "list"])
        .env("HOME", std::env::temp_dir())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Unreachable server should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to send request"));
}
