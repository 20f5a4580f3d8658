//! Smoke tests for command wiring

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary isolated from the caller's home directory and environment.
fn botdetect(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("botdetect").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("DATABASE_URL")
        .env_remove("BOTDETECT_BIND")
        .env_remove("BOTDETECT_MODEL_URL")
        .env_remove("BOTDETECT_FEEDBACK_WEBHOOK")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_serve_help() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--migrate"))
        .stdout(predicate::str::contains("--cors-restricted"));
}

#[test]
fn test_serve_rejects_bad_bind() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["serve", "--bind", "not-an-address"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--bind"));
}

#[test]
fn test_serve_rejects_zero_workers_before_connecting() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["serve", "--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_config_path_lists_search_paths() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml (missing)"))
        .stdout(predicate::str::contains("botdetect.toml (missing)"));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bind_addr = \"127.0.0.1:5000\""))
        .stdout(predicate::str::contains("backend = \"stored\""));
}

#[test]
fn test_config_show_merges_local_file_and_env() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("botdetect.toml"),
        "[detections]\nqueue_capacity = 7\n\n[database]\nurl = \"postgres://bot:secret@db/playerdata\"\n",
    )
    .unwrap();

    botdetect(&home)
        .env("BOTDETECT_BIND", "0.0.0.0:8080")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("queue_capacity = 7"))
        .stdout(predicate::str::contains("bind_addr = \"0.0.0.0:8080\""))
        .stdout(predicate::str::contains("postgres://bot:***@db/playerdata"))
        .stdout(predicate::str::contains("secret").not());
}

#[test]
fn test_dotenv_applies_before_logging() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".env"),
        "RUST_LOG=debug\nBOTDETECT_BIND=0.0.0.0:9000\n",
    )
    .unwrap();

    botdetect(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bind_addr = \"0.0.0.0:9000\""))
        .stderr(predicate::str::contains("Loaded"));
}

#[test]
fn test_config_show_missing_explicit_file() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["config", "show", "--config", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_migrate_list_needs_no_database() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["migrate", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schema"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    botdetect(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("botdetect"));
}
