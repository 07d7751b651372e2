//! CLI integration tests for Slipway.
//!
//! These tests verify the full CLI workflow from manifest to generated
//! build file.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the slipway binary command, with toolchain overrides scrubbed
/// from the inherited environment so defaults are actually exercised.
fn slipway() -> Command {
    let mut cmd = Command::cargo_bin("slipway").unwrap();
    for key in ["CC", "AR", "LINK", "CFLAGS", "ARFLAGS", "LINKFLAGS"] {
        cmd.env_remove(key);
    }
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const MANIFEST: &str = r#"
[project]
name = "foundation"

[[lib]]
module = "foundation"
sources = ["array.c", "md5.c", "fs.c"]

[[bin]]
module = "bin2hex"
basepath = "tools"
sources = ["main.c"]
libs = ["foundation"]
implicit-deps = ["foundation"]
"#;

fn write_manifest(dir: &TempDir) {
    fs::write(dir.path().join("Slipway.toml"), MANIFEST).unwrap();
}

fn read_unwrapped(dir: &TempDir, name: &str) -> String {
    let raw = fs::read_to_string(dir.path().join(name)).unwrap();
    // join ninja line continuations so assertions see whole statements
    raw.replace(" $\n      ", " ").replace(" $\n    ", " ")
}

// ============================================================================
// slipway generate
// ============================================================================

#[test]
fn test_generate_emits_build_file() {
    let tmp = temp_dir();
    write_manifest(&tmp);

    slipway()
        .args(["generate", "--target", "linux"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read_unwrapped(&tmp, "build.ninja");
    assert!(ninja.contains("ninja_required_version = 1.3"));
    assert!(ninja.contains("rule cc"));
    assert!(ninja.contains("rule ar"));
    assert!(ninja.contains("rule link"));
    assert!(ninja.contains("build bin/linux/release/"));
}

#[test]
fn test_generate_defaults_to_clang_and_release() {
    // linux target, toolchain unset -> clang; config unset -> release;
    // arch unset -> single native arch from uname -m
    let tmp = temp_dir();
    write_manifest(&tmp);

    slipway()
        .args(["generate", "--target", "linux"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read_unwrapped(&tmp, "build.ninja");
    assert!(ninja.contains("configure_toolchain = clang"));
    assert!(ninja.contains("cc = clang"));
    assert!(ninja.contains("/release/"));
    assert!(!ninja.contains("/debug/"));

    let machine = String::from_utf8(
        Command::new("uname").arg("-m").output().unwrap().stdout,
    )
    .unwrap();
    if machine.trim() == "x86_64" {
        assert!(ninja.contains("release/x86-64/"));
    }
}

#[test]
fn test_generate_explicit_toolchain_and_configs() {
    let tmp = temp_dir();
    write_manifest(&tmp);

    slipway()
        .args([
            "generate",
            "--target",
            "linux",
            "--toolchain",
            "gcc",
            "--config",
            "debug",
            "--config",
            "release",
            "--arch",
            "x86-64",
        ])
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read_unwrapped(&tmp, "build.ninja");
    assert!(ninja.contains("configure_toolchain = gcc"));
    assert!(ninja.contains("cc = gcc"));
    assert!(ninja.contains("/debug/x86-64/"));
    assert!(ninja.contains("/release/x86-64/"));
}

#[test]
fn test_generate_is_deterministic() {
    let tmp = temp_dir();
    write_manifest(&tmp);

    let args = ["generate", "--target", "linux", "--arch", "x86-64"];
    slipway()
        .args(args)
        .current_dir(tmp.path())
        .assert()
        .success();
    let first = fs::read_to_string(tmp.path().join("build.ninja")).unwrap();

    slipway()
        .args(args)
        .current_dir(tmp.path())
        .assert()
        .success();
    let second = fs::read_to_string(tmp.path().join("build.ninja")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_generate_rejects_unknown_target() {
    let tmp = temp_dir();
    write_manifest(&tmp);

    slipway()
        .args(["generate", "--target", "solaris"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("solaris"));
}

#[test]
fn test_generate_rejects_unknown_config() {
    let tmp = temp_dir();
    write_manifest(&tmp);

    slipway()
        .args(["generate", "--target", "linux", "--config", "fastdebug"])
        .current_dir(tmp.path())
        .assert()
        .failure();
}

#[test]
fn test_generate_without_manifest_fails() {
    let tmp = temp_dir();

    slipway()
        .args(["generate", "--target", "linux"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Slipway.toml"));
}

#[test]
fn test_generate_cc_override() {
    let tmp = temp_dir();
    write_manifest(&tmp);

    slipway()
        .args([
            "generate",
            "--target",
            "linux",
            "--arch",
            "x86-64",
            "--cc",
            "clang-11",
            "--cflags",
            "-fsanitize=address",
        ])
        .current_dir(tmp.path())
        .assert()
        .success();

    let ninja = read_unwrapped(&tmp, "build.ninja");
    assert!(ninja.contains("cc = clang-11"));
    assert!(ninja.contains("-fsanitize=address"));
}

// ============================================================================
// slipway coverage
// ============================================================================

#[test]
fn test_coverage_writes_empty_report() {
    let tmp = temp_dir();
    let objdir = tmp.path().join("obj");
    let srcdir = tmp.path().join("src");
    fs::create_dir_all(&objdir).unwrap();
    fs::create_dir_all(&srcdir).unwrap();
    fs::write(srcdir.join("array.c"), "int x;\n").unwrap();

    slipway()
        .args([
            "coverage",
            "--objectdir",
            objdir.to_str().unwrap(),
            "--sourcedir",
            srcdir.to_str().unwrap(),
        ])
        .current_dir(tmp.path())
        .assert()
        .success();

    let report = fs::read_to_string(tmp.path().join("codecovreport.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert!(value["coverage"].is_object());
}

#[test]
fn test_coverage_merges_saved_reports() {
    let tmp = temp_dir();
    let objdir = tmp.path().join("obj");
    let srcdir = tmp.path().join("src");
    fs::create_dir_all(&objdir).unwrap();
    fs::create_dir_all(&srcdir).unwrap();
    fs::write(srcdir.join("array.c"), "int x;\n").unwrap();
    fs::write(
        tmp.path().join("saved.json"),
        r#"{"source_files":[{"name":"src/array.c","coverage":[null,3,0]}]}"#,
    )
    .unwrap();

    slipway()
        .args([
            "coverage",
            "--objectdir",
            objdir.to_str().unwrap(),
            "--sourcedir",
            srcdir.to_str().unwrap(),
            "--merge",
            "saved.json",
        ])
        .current_dir(tmp.path())
        .assert()
        .success();

    let report = fs::read_to_string(tmp.path().join("codecovreport.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();
    let lines = &value["coverage"][srcdir.join("array.c").to_str().unwrap()];
    // codecov arrays are 1-indexed: leading null, then the merged report
    assert!(lines[0].is_null());
    assert_eq!(lines[2], serde_json::json!(3));
}

#[test]
fn test_coverage_rejects_unknown_service() {
    let tmp = temp_dir();
    slipway()
        .args([
            "coverage",
            "--objectdir",
            ".",
            "--sourcedir",
            ".",
            "--service",
            "gcovr",
        ])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("gcovr"));
}

// ============================================================================
// slipway version
// ============================================================================

#[test]
fn test_version_stamps_from_git_describe() {
    if Command::new("git").arg("--version").output().is_err() {
        return;
    }

    let tmp = temp_dir();
    let git = |args: &[&str]| {
        Command::new("git")
            .args(args)
            .current_dir(tmp.path())
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .output()
            .unwrap()
    };
    git(&["init", "-q"]);
    fs::write(tmp.path().join("file"), "content").unwrap();
    git(&["add", "file"]);
    git(&["commit", "-q", "-m", "initial"]);
    git(&["tag", "-a", "1.2.3", "-m", "release"]);

    slipway()
        .args(["version", "--project", "foundation"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let version = fs::read_to_string(tmp.path().join("version.c")).unwrap();
    assert!(version.contains("foundation_version"));
    assert!(version.contains("version_make(1, 2, 3,"));
}

// ============================================================================
// slipway completions
// ============================================================================

#[test]
fn test_completions_bash() {
    slipway()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("slipway"));
}
