//! Integration tests for the oathkit command line
//!
//! Each test runs the binary against its own configuration directory using
//! the file storage backend.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const OATHKIT_BINARY: &str = env!("CARGO_BIN_EXE_oathkit");
const SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

fn oathkit(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(OATHKIT_BINARY)
        .args(args)
        .env("OATHKIT_CONFIG_DIR", config_dir)
        .env_remove("JOURNAL_STREAM")
        .output()
        .expect("Failed to run oathkit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = tempdir().unwrap();
    let output = oathkit(temp_dir.path(), &["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let text = stdout(&output);
    for command in ["setup", "add", "list", "show", "code", "export", "delete"] {
        assert!(text.contains(command), "Help should mention {}", command);
    }
}

#[test]
fn test_setup_writes_config_once() {
    let temp_dir = tempdir().unwrap();

    let output = oathkit(temp_dir.path(), &["setup", "--backend", "file"]);
    assert!(output.status.success());
    let config_path = temp_dir.path().join("config.toml");
    assert!(config_path.exists());
    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("backend = \"file\""));

    // Second run without --force leaves the file alone
    let output = oathkit(temp_dir.path(), &["setup", "--backend", "memory"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("--force"));
    let unchanged = std::fs::read_to_string(&config_path).unwrap();
    assert_eq!(contents, unchanged);

    let output = oathkit(temp_dir.path(), &["setup", "--backend", "memory", "--force"]);
    assert!(output.status.success());
    let replaced = std::fs::read_to_string(&config_path).unwrap();
    assert!(replaced.contains("backend = \"memory\""));
}

#[test]
fn test_credential_lifecycle() {
    let temp_dir = tempdir().unwrap();
    let uri = format!("otpauth://hotp/Example:alice?secret={}&issuer=Example", SECRET);

    let output = oathkit(temp_dir.path(), &["add", &uri]);
    assert!(output.status.success(), "add failed: {:?}", output);
    assert!(stdout(&output).contains("Example-alice"));

    let output = oathkit(temp_dir.path(), &["list", "--json"]);
    assert!(output.status.success());
    let listed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(listed[0]["id"], "Example-alice");
    assert_eq!(listed[0]["isLocked"], false);
    assert!(!stdout(&output).contains(SECRET));

    // HOTP codes advance across invocations
    let output = oathkit(temp_dir.path(), &["code", "Example-alice"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "755224");

    let output = oathkit(temp_dir.path(), &["code", "Example-alice", "--validity"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("287082"));
    assert_eq!(lines.next(), Some("counter: 1"));

    let output = oathkit(temp_dir.path(), &["export", "Example-alice"]);
    assert!(output.status.success());
    let exported = stdout(&output);
    assert!(exported.starts_with("otpauth://hotp/Example:alice?"));
    assert!(exported.contains("counter=2"));

    let output = oathkit(temp_dir.path(), &["delete", "Example-alice"]);
    assert!(output.status.success());

    let output = oathkit(temp_dir.path(), &["show", "Example-alice"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_totp_code_is_digits() {
    let temp_dir = tempdir().unwrap();
    let uri = format!("otpauth://totp/Example:bob?secret={}&digits=8", SECRET);
    assert!(oathkit(temp_dir.path(), &["add", &uri]).status.success());

    let output = oathkit(temp_dir.path(), &["code", "Example-bob"]);
    assert!(output.status.success());
    let code = stdout(&output).trim().to_string();
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let output = oathkit(temp_dir.path(), &["code", "Example-bob", "--validity"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let validity = text.lines().nth(1).unwrap();
    assert!(validity.starts_with("valid for "), "got {:?}", validity);
    assert!(validity.ends_with("% elapsed)"), "got {:?}", validity);
}

#[test]
fn test_invalid_uri_exit_code() {
    let temp_dir = tempdir().unwrap();
    let output = oathkit(temp_dir.path(), &["add", "otpauth://totp/Example:alice"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("secret"));
}

#[test]
fn test_unknown_credential_exit_code() {
    let temp_dir = tempdir().unwrap();
    let output = oathkit(temp_dir.path(), &["code", "missing"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_config_exit_code() {
    let temp_dir = tempdir().unwrap();
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[environment]\ntamper_score = 7.0\n",
    )
    .unwrap();

    let output = oathkit(temp_dir.path(), &["list"]);
    assert_eq!(output.status.code(), Some(2));
}
