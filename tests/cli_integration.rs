//! End-to-end CLI tests: resolve, build, tree, and flags against real
//! on-disk manifests.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn crucible() -> Command {
    Command::cargo_bin("crucible").unwrap()
}

fn write_exe_project(dir: &std::path::Path, name: &str) {
    fs::write(
        dir.join("Crucible.toml"),
        format!(
            r#"[package]
name = "{name}"
version = "0.1.0"

[targets.{name}]
kind = "exe"
sources = ["src/**/*.c"]
"#
        ),
    )
    .unwrap();

    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(
        dir.join("src/main.c"),
        "int main(void) { return 0; }\n",
    )
    .unwrap();
}

#[test]
fn test_resolve_writes_lockfile() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "resolvetest");

    crucible()
        .arg("resolve")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved 1 package"));

    assert!(tmp.path().join("Crucible.lock").exists());
}

#[test]
fn test_resolve_reuses_fresh_lockfile() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "resolvecache");

    crucible()
        .arg("resolve")
        .current_dir(tmp.path())
        .assert()
        .success();

    // Second resolve without --force should still succeed and report the
    // same package count, reading the lockfile it just wrote.
    crucible()
        .arg("resolve")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved 1 package"));
}

#[test]
fn test_build_simple_project() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "buildtest");

    crucible()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));

    let target_dir = tmp.path().join(".crucible").join("target").join("debug");
    assert!(target_dir.exists());
}

#[test]
fn test_build_release_mode_uses_separate_output_dir() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "releasetest");

    crucible()
        .args(["build", "--release"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let target_dir = tmp.path().join(".crucible").join("target").join("release");
    assert!(target_dir.exists());
}

#[test]
fn test_build_emits_compile_commands_by_default() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "compdbtest");

    crucible()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .success();

    let compile_commands = tmp.path().join(".crucible/target/debug/compile_commands.json");
    assert!(compile_commands.exists());

    let contents = fs::read_to_string(compile_commands).unwrap();
    assert!(contents.contains("\"directory\""));
    assert!(contents.contains("\"arguments\""));
    assert!(contents.contains("\"file\""));
    assert!(!contents.contains("\"output\""));
}

#[test]
fn test_build_plan_dry_run_skips_compilation() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "plantest");

    crucible()
        .args(["build", "--plan"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("plantest"));

    // --plan must not actually invoke the compiler.
    let target_dir = tmp.path().join(".crucible/target/debug/obj");
    assert!(!target_dir.exists());
}

#[test]
fn test_build_fails_without_manifest() {
    let tmp = TempDir::new().unwrap();

    crucible()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure();
}

#[test]
fn test_tree_shows_root_package() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "treetest");

    crucible()
        .arg("tree")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("treetest"));
}

#[test]
fn test_flags_shows_compile_and_link_for_target() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "flagstest");

    crucible()
        .args(["flags", "flagstest"])
        .current_dir(tmp.path())
        .assert()
        .success();
}

#[test]
fn test_flags_unknown_target_fails() {
    let tmp = TempDir::new().unwrap();
    write_exe_project(tmp.path(), "flagsmiss");

    crucible()
        .args(["flags", "nonexistent"])
        .current_dir(tmp.path())
        .assert()
        .failure();
}

#[test]
fn test_full_workflow_with_path_dependency() {
    let tmp = TempDir::new().unwrap();

    // A static library exposing one public header.
    let lib_dir = tmp.path().join("mylib");
    fs::create_dir_all(lib_dir.join("src")).unwrap();
    fs::create_dir_all(lib_dir.join("include")).unwrap();
    fs::write(
        lib_dir.join("Crucible.toml"),
        r#"[package]
name = "mylib"
version = "0.1.0"

[targets.mylib]
kind = "staticlib"
sources = ["src/**/*.c"]
public_headers = ["include/**/*.h"]

[targets.mylib.surface.compile.public]
include_dirs = ["include"]
"#,
    )
    .unwrap();
    fs::write(
        lib_dir.join("include/mylib.h"),
        "#define MYLIB_VERSION 1\n",
    )
    .unwrap();
    fs::write(
        lib_dir.join("src/mylib.c"),
        "int mylib_version(void) { return 1; }\n",
    )
    .unwrap();

    // An executable that depends on it by path.
    let app_dir = tmp.path().join("myapp");
    fs::create_dir_all(app_dir.join("src")).unwrap();
    fs::write(
        app_dir.join("Crucible.toml"),
        r#"[package]
name = "myapp"
version = "0.1.0"

[dependencies]
mylib = { path = "../mylib" }

[targets.myapp]
kind = "exe"
sources = ["src/**/*.c"]
"#,
    )
    .unwrap();
    fs::write(
        app_dir.join("src/main.c"),
        r#"#include "mylib.h"

int main(void) {
    return MYLIB_VERSION - 1;
}
"#,
    )
    .unwrap();

    crucible()
        .arg("tree")
        .current_dir(&app_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("myapp"))
        .stdout(predicate::str::contains("mylib"));

    crucible()
        .arg("build")
        .current_dir(&app_dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));
}
