//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Test project context
///
/// A temporary SDK checkout with its release configuration, plus a fake
/// package root and fake build tools next to it.
pub struct TestProject {
    /// Temporary directory holding the checkout and the package root
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        std::fs::create_dir_all(project.path()).expect("Failed to create checkout");
        std::fs::create_dir_all(project.sdk_root()).expect("Failed to create package root");
        project
    }

    /// Checkout root
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("mepa")
    }

    /// Fake package root
    pub fn sdk_root(&self) -> PathBuf {
        self.dir.path().join("opt")
    }

    /// Create a file in the checkout
    pub fn create_file(&self, name: &str, content: &str) {
        write(&self.path().join(name), content);
    }

    /// Create an executable shell script in the checkout
    pub fn create_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        write_script(&path, body);
        path
    }

    /// Create a directory in the checkout
    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir_all(self.path().join(name)).expect("Failed to create directory");
    }

    /// Check if a file exists in the checkout
    pub fn file_exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }

    /// Read a file from the checkout
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.path().join(name)).expect("Failed to read file")
    }

    /// Write `.cmake/release.yaml` with `extra` appended below `conf:`
    pub fn write_release_config(&self, extra: &str) {
        let cmake = self.dir.path().join("tools/cmake");
        write_script(&cmake, FAKE_CMAKE);
        let config = format!(
            "conf:\n  product: mepa\n  friendly_name_prv: MEPA-2023.12\n  friendly_name_cur: MEPA-2024.03\n  sdk_root: {}\n  installer: \"true\"\n  build:\n    cmake: {}\n    make: \"true\"\n    jobs: 2\n  prune:\n    image_dirs: [mepa_demo]\n{extra}",
            self.sdk_root().display(),
            cmake.display()
        );
        self.create_file(".cmake/release.yaml", &config);
    }

    /// Write `.cmake/cmake-presets.yaml`
    pub fn write_presets(&self, presets: &str) {
        self.create_file(".cmake/cmake-presets.yaml", presets);
    }

    /// Initialize a git repository on `branch` and commit everything
    pub fn git_commit_all(&self, branch: &str) {
        git(&self.path(), &["init", "-q", "-b", branch]);
        git(&self.path(), &["add", "-A"]);
        git(
            &self.path(),
            &[
                "-c",
                "user.name=Release Bot",
                "-c",
                "user.email=release@example.com",
                "commit",
                "-q",
                "-m",
                "initial",
            ],
        );
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Fake CMake: "configures" by dropping build leftovers and images in the
/// current directory; fails when given `-DFAIL=1`
pub const FAKE_CMAKE: &str = r#"case "$*" in *-DFAIL=1*) echo "configure failed" >&2; exit 1;; esac
mkdir -p CMakeFiles/objs mepa_demo
echo obj > CMakeFiles/objs/main.o
echo cache > CMakeCache.txt
echo fit > mepa_demo/mepa_demo.itb
echo elf > mepa_demo/mepa_demo"#;

/// Two release presets and one development preset
pub const SAMPLE_PRESETS: &str = r#"
presets:
  arm64:
    arch: arm64
    toolchain: "2024.02-105"
    toolchainfile: arm64.cmake
    release_artifact: true
  x86:
    arch: x86_64
    toolchain: "2024.02-105"
    toolchainfile: x86.cmake
    cmake_flags: -DCMAKE_BUILD_TYPE=Debug
    release_artifact: true
  debug:
    toolchain: "2024.02-105"
    toolchainfile: x86.cmake
"#;

/// Write a file, creating its parent directories
pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

/// Write an executable `/bin/sh` script
pub fn write_script(path: &Path, body: &str) {
    write(path, &format!("#!/bin/sh\n{body}\n"));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
    }
}

/// Whether a git binary is available
pub fn has_git() -> bool {
    which::which("git").is_ok()
}

/// Run git in `dir`
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
