//! CLI smoke tests for the offline commands.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn fisco(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("fisco-rs").expect("binary");
    cmd.arg("--db-path").arg(db_path);
    cmd
}

#[test]
fn test_init_then_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("fisco.db");

    fisco(&db_path)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("inicializada"));

    fisco(&db_path)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Documentos:    0"));
}

#[test]
fn test_status_without_init_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("missing.db");

    fisco(&db_path)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_reingest_laws_requires_scope() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("fisco.db");

    fisco(&db_path)
        .args(["reingest", "laws", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--all"));
}

#[test]
fn test_reingest_laws_missing_base_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("fisco.db");

    fisco(&db_path)
        .args([
            "reingest",
            "laws",
            "--all",
            "--dry-run",
            "--base-path",
            "/nonexistent/leyes",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base path"));
}
