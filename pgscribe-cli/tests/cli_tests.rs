//! CLI integration tests for pgscribe.
//!
//! These cover argument parsing, help output and configuration errors;
//! none of them needs a running database.

use assert_cmd::Command;
use predicates::prelude::*;

const DB_VARS: [&str; 7] = [
    "DATABASE_URL",
    "DB_HOST",
    "DB_PORT",
    "DB_NAME",
    "DB_USERNAME",
    "DB_USER",
    "DB_PASSWORD",
];

/// The pgscribe binary, run in an empty directory with no database variables
fn cmd(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pgscribe").unwrap();
    cmd.current_dir(dir.path());
    for var in DB_VARS {
        cmd.env_remove(var);
    }
    cmd
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("db"))
        .stdout(predicate::str::contains("--database-url"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pgscribe"));
}

#[test]
fn test_generate_help_lists_flags_and_targets() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--tables"))
        .stdout(predicate::str::contains("--exclude"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--clean"))
        .stdout(predicate::str::contains(
            "Remove only this target's directories under the output root",
        ))
        .stdout(predicate::str::contains("--include-views"))
        .stdout(predicate::str::contains("migrations"))
        .stdout(predicate::str::contains("scaffold"));
}

#[test]
fn test_db_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["db", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test-connection"))
        .stdout(predicate::str::contains("list-tables"))
        .stdout(predicate::str::contains("describe"));
}

// =============================================================================
// Argument Errors
// =============================================================================

#[test]
fn test_unknown_target_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["generate", "controllers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_generate_requires_target() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir).arg("generate").assert().failure();
}

#[test]
fn test_describe_rejects_unknown_format() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["db", "describe", "users", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[test]
fn test_generate_without_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["generate", "models"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No database configured"));

    assert!(!dir.path().join("generated").exists());
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args(["--config", "missing.toml", "db", "test-connection"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_malformed_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pgscribe.toml"), "[database\nhost = ").unwrap();
    cmd(&dir)
        .args(["db", "list-tables"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_invalid_port_in_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .env("DB_PORT", "not-a-port")
        .args(["db", "test-connection"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid DB_PORT value"));
}

#[test]
fn test_invalid_timestamp_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    cmd(&dir)
        .args([
            "--database-url",
            "postgres://localhost/blog",
            "generate",
            "migrations",
            "--timestamp",
            "yesterday",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timestamp value"));
}
