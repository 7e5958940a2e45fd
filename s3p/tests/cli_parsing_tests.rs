//! CLI argument parsing tests for s3p
//!
//! Everything here fails or succeeds before a client is built, so no object store is needed.

use assert_cmd::Command;
use predicates::prelude::*;

fn s3p() -> Command {
    let mut cmd = Command::cargo_bin("s3p").unwrap();
    // keep the ambient environment from changing worker counts or log levels
    cmd.env_remove("S3P_JOBS").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_runs() {
    s3p()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("put"));
}

#[test]
fn test_version_flag_runs() {
    s3p()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_subcommand_prints_build_info() {
    s3p()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "s3p {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_get_help_lists_flags() {
    s3p()
        .args(["get", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--recursive"))
        .stdout(predicate::str::contains("--jobs"))
        .stdout(predicate::str::contains("--version-id"))
        .stdout(predicate::str::contains("--no-local-path-check"));
}

#[test]
fn test_put_help_lists_flags() {
    s3p()
        .args(["put", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--jobs"))
        .stdout(predicate::str::contains("--no-local-path-check"));
}

#[test]
fn test_global_flags_after_subcommand() {
    s3p()
        .args(["get", "--help", "-vv", "--summary", "--path-style"])
        .assert()
        .success();
}

// ============================================================================
// Argument errors
// ============================================================================

#[test]
fn test_missing_subcommand_fails() {
    s3p().assert().failure();
}

#[test]
fn test_get_requires_local_path() {
    s3p()
        .args(["get", "s3://bucket/key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LOCAL_PATH"));
}

#[test]
fn test_put_requires_source_and_destination() {
    s3p().args(["put", "s3://bucket/prefix"]).assert().failure();
}

#[test]
fn test_jobs_must_be_a_number() {
    s3p()
        .args(["get", "--jobs", "many", "s3://bucket/key", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_version_id_with_recursive_fails() {
    s3p()
        .args([
            "get",
            "--recursive",
            "--version-id",
            "v1",
            "s3://bucket/key",
            "out",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "version ID cannot be specified when downloading recursively",
        ));
}

#[test]
fn test_version_id_with_recursive_quiet_fails_silently() {
    s3p()
        .args([
            "-q",
            "get",
            "-r",
            "--version-id",
            "v1",
            "s3://bucket/key",
            "out",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}

// ============================================================================
// URI validation
// ============================================================================

#[test]
fn test_list_rejects_wrong_scheme() {
    s3p()
        .args(["list", "gs://bucket/prefix"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid scheme"));
}

#[test]
fn test_get_rejects_missing_scheme() {
    s3p()
        .args(["get", "bucket/key", "out"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid uri"));
}

#[test]
fn test_get_rejects_traversal_key() {
    s3p()
        .args(["get", "s3://bucket/../../etc/passwd", "out"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid remote path"));
}

#[test]
fn test_put_rejects_empty_bucket() {
    s3p()
        .args(["put", "Cargo.toml", "s3:///prefix"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing bucket name"));
}
