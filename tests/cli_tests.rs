//! CLI integration tests for the errchain binary
//!
//! These tests verify that the CLI commands work correctly by running
//! the actual compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a Command instance for the errchain binary, with colors disabled
#[allow(deprecated)]
fn errchain_cmd() -> Command {
    let mut cmd = Command::cargo_bin("errchain").expect("Failed to find errchain binary");
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file
}

// ============================================================================
// --help / --version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    errchain_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("categories"));
}

#[test]
fn test_version_flag() {
    errchain_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    errchain_cmd().assert().failure();
}

// ============================================================================
// categories
// ============================================================================

#[test]
fn test_categories_lists_all() {
    errchain_cmd()
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown"))
        .stdout(predicate::str::contains("InsufficientCredits"))
        .stdout(predicate::str::is_match(r"RateLimit\s+retry\s+wait=60s").unwrap())
        .stdout(predicate::str::is_match(r"Auth\s+no-retry\s+wait=0s").unwrap());
}

// ============================================================================
// classify
// ============================================================================

#[test]
fn test_classify_rate_limit_by_status() {
    errchain_cmd()
        .args([
            "classify",
            "--provider",
            "openai",
            "--status",
            "429",
            "--message",
            "network hiccup",
            "--correlation-id",
            "req-1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error: The AI provider is rate limiting requests.",
        ))
        .stdout(predicate::str::contains("Failed in api-client during generate_content"))
        .stdout(predicate::str::contains("1. Wait a minute and try again"))
        .stdout(predicate::str::contains("retried after 60 seconds"))
        .stdout(predicate::str::contains("Correlation ID: req-1"));
}

#[test]
fn test_classify_by_message_text() {
    errchain_cmd()
        .args([
            "classify",
            "--provider",
            "gemini",
            "--message",
            "context deadline exceeded",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("The operation was cancelled."));
}

#[test]
fn test_classify_generates_correlation_id() {
    errchain_cmd()
        .args(["classify", "--provider", "openai", "--status", "500"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Correlation ID: [0-9a-f]{8}-[0-9a-f]{4}-").unwrap());
}

#[test]
fn test_classify_json_payload() {
    let output = errchain_cmd()
        .args([
            "classify",
            "--provider",
            "openai",
            "--status",
            "401",
            "--correlation-id",
            "req-9",
            "--model",
            "gpt-4o",
            "--stage",
            "synthesis",
            "--json",
        ])
        .output()
        .expect("Failed to run errchain");

    assert!(output.status.success());
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(payload["category"], "Auth");
    assert_eq!(payload["correlation_id"], "req-9");
    assert_eq!(payload["provider"], "openai");
    assert_eq!(payload["status_code"], 401);
    assert_eq!(payload["retry_possible"], false);
    assert_eq!(payload["layers"]["model-processor"]["details"]["model_name"], "gpt-4o");
    assert_eq!(
        payload["layers"]["orchestrator"]["details"]["workflow_stage"],
        "synthesis"
    );
    assert_eq!(payload["layers"]["cli"]["details"]["command"]["name"], "classify");
}

#[test]
fn test_classify_body_is_appended_once() {
    errchain_cmd()
        .args([
            "classify",
            "--provider",
            "openai",
            "--status",
            "400",
            "--body",
            "max_tokens too large",
            "--verbose",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Message: Invalid request sent to the openai API (max_tokens too large)",
        ))
        .stdout(predicate::str::contains("Debug payload:"));
}

#[test]
fn test_classify_requires_provider() {
    errchain_cmd()
        .arg("classify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--provider"));
}

#[test]
fn test_json_conflicts_with_verbose() {
    errchain_cmd()
        .args(["classify", "--provider", "openai", "--json", "--verbose"])
        .assert()
        .failure();
}

// ============================================================================
// --config
// ============================================================================

#[test]
fn test_config_verbose_display() {
    let config = write_config("[display]\nverbose = true\n");
    errchain_cmd()
        .arg("--config")
        .arg(config.path())
        .args(["classify", "--provider", "openai", "--status", "503"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Debug payload:"))
        .stdout(predicate::str::contains("Provider: openai"));
}

#[test]
fn test_config_missing_file() {
    errchain_cmd()
        .args(["--config", "/nonexistent/errchain.toml", "categories"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_config_env_override() {
    errchain_cmd()
        .env("ERRCHAIN__DISPLAY__VERBOSE", "true")
        .args(["classify", "--provider", "openai", "--status", "404"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The requested model was not found."))
        .stdout(predicate::str::contains("Debug payload:"));
}

// ============================================================================
// Color handling
// ============================================================================

#[test]
fn test_no_color_flag_strips_all_escape_codes() {
    let output = errchain_cmd()
        .env_remove("NO_COLOR")
        .args([
            "--no-color",
            "classify",
            "--provider",
            "openai",
            "--status",
            "500",
            "--verbose",
        ])
        .output()
        .expect("Failed to run errchain");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be UTF-8");
    assert!(stdout.contains("Provider error:"));
    assert!(stdout.contains("Debug payload:"));
    assert!(!stdout.contains('\x1b'), "unexpected escape codes: {stdout:?}");
}

#[test]
fn test_config_color_false_strips_all_escape_codes() {
    let config = write_config("[display]\ncolor = false\nverbose = true\n");
    let output = errchain_cmd()
        .env_remove("NO_COLOR")
        .arg("--config")
        .arg(config.path())
        .args(["classify", "--provider", "openai", "--message", "rate limit hit"])
        .output()
        .expect("Failed to run errchain");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be UTF-8");
    assert!(stdout.contains("Debug payload:"));
    assert!(!stdout.contains('\x1b'), "unexpected escape codes: {stdout:?}");
}

#[test]
fn test_verbose_reports_matched_message_pattern() {
    errchain_cmd()
        .args([
            "classify",
            "--provider",
            "gemini",
            "--message",
            "dial tcp: connection refused",
            "--verbose",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Message pattern:"))
        .stdout(predicate::str::contains(
            "Connection error -> Network (matched \"connection\")",
        ));
}

// ============================================================================
// Log level names
// ============================================================================

#[test]
fn test_log_level_alias_from_env() {
    errchain_cmd()
        .env("ERRCHAIN__LOGGING__LEVEL", "warning")
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("RateLimit"));
}

#[test]
fn test_log_level_mixed_case_from_config() {
    let config = write_config("[logging]\nlevel = \"ERROR\"\n");
    errchain_cmd()
        .arg("--config")
        .arg(config.path())
        .arg("categories")
        .assert()
        .success();
}

#[test]
fn test_unknown_log_level_is_config_error() {
    errchain_cmd()
        .env("ERRCHAIN__LOGGING__LEVEL", "loud")
        .arg("categories")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown log level: loud"));
}
