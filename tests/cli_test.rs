//! Integration tests for the command-line binaries

mod common;

use common::{has_git, TestProject, SAMPLE_PRESETS};
use std::process::{Command, Output};

fn run(binary: &str, project: &TestProject, args: &[&str]) -> Output {
    Command::new(binary)
        .current_dir(project.path())
        .env_remove("BRANCH_NAME")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_release_flags() {
    let project = TestProject::new();
    let output = run(env!("CARGO_BIN_EXE_shipyard"), &project, &["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    for flag in ["--parallel", "--simplegrid", "--no-compile", "--internal-checks", "--branch"] {
        assert!(help.contains(flag), "missing {flag} in help");
    }
}

#[test]
fn test_version() {
    let project = TestProject::new();
    let output = run(env!("CARGO_BIN_EXE_shipyard"), &project, &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_configuration_exits_with_error_chain() {
    let project = TestProject::new();
    let output = run(env!("CARGO_BIN_EXE_shipyard"), &project, &[]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Failed to load configuration"));
    assert!(err.contains("release.yaml"));
}

#[test]
fn test_internal_checks_without_tools_is_rejected() {
    let project = TestProject::new();
    project.write_release_config("");
    project.write_presets(SAMPLE_PRESETS);
    let output = run(env!("CARGO_BIN_EXE_shipyard"), &project, &["-i"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_rejected_options_keep_previous_outputs() {
    let project = TestProject::new();
    project.write_release_config("");
    project.write_presets(SAMPLE_PRESETS);
    project.create_file("images/previous_release.tar.gz", "old release");
    project.create_file("release_ws/keep.txt", "old workspace");

    let output = run(env!("CARGO_BIN_EXE_shipyard"), &project, &["-i"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(project.read_file("images/previous_release.tar.gz"), "old release");
    assert!(project.file_exists("release_ws/keep.txt"));
}

#[cfg(unix)]
#[test]
fn test_release_run_exit_code_and_reports() {
    if !has_git() {
        eprintln!("git not available, skipping");
        return;
    }
    let project = TestProject::new();
    project.write_release_config("");
    project.write_presets(SAMPLE_PRESETS);
    project.create_file("mepa/src/phy.c", "int phy;\n");
    project.git_commit_all("main");

    let output = run(env!("CARGO_BIN_EXE_shipyard"), &project, &["-j", "--branch", "release"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("combined status: OK"));
    assert!(out.contains("@release"));
    assert!(project.file_exists("images/status.json"));
    assert!(project.file_exists("images/build.log"));
}

#[test]
fn test_project_without_preset_lists_presets() {
    let project = TestProject::new();
    project.write_release_config("");
    project.write_presets(SAMPLE_PRESETS);
    let output = run(env!("CARGO_BIN_EXE_shipyard-project"), &project, &[]);
    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("Usage: shipyard-project"));
    for preset in ["arm64", "x86", "debug"] {
        assert!(out.contains(preset));
    }
}

#[test]
fn test_project_unknown_preset() {
    let project = TestProject::new();
    project.write_release_config("");
    project.write_presets(SAMPLE_PRESETS);
    let output = run(env!("CARGO_BIN_EXE_shipyard-project"), &project, &["riscv"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Not found: \"riscv\""));
    assert!(!project.file_exists("build-riscv"));
}

#[test]
fn test_aggregate_requires_workspace() {
    let project = TestProject::new();
    project.write_release_config("");
    project.write_presets(SAMPLE_PRESETS);
    let output = run(env!("CARGO_BIN_EXE_shipyard-aggregate"), &project, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no workspace"));
}
