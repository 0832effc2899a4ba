//! Distributed build grid
//!
//! Wraps a build script into a grid client invocation. The grid receives the
//! source tarball, runs the script inside the build container and returns the
//! requested output directory as a tar file.

use std::path::{Path, PathBuf};

use crate::config::release::GridSettings;
use crate::infra::command::CommandLine;

/// One compile job dispatched to the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridJob {
    client: String,
    pool: String,
    env: Vec<(String, String)>,
    workspace_tar: PathBuf,
    script: String,
    artifacts: PathBuf,
    output: PathBuf,
    log: PathBuf,
    meta: Vec<(String, String)>,
}

impl GridJob {
    /// Job running `script` against `workspace_tar` with the configured client,
    /// pool and container image
    pub fn new(settings: &GridSettings, workspace_tar: impl Into<PathBuf>, script: impl Into<String>) -> Self {
        Self {
            client: settings.client.clone(),
            pool: settings.pool.clone(),
            env: vec![
                ("MCHP_DOCKER_NAME".to_string(), settings.image.clone()),
                ("MCHP_DOCKER_TAG".to_string(), settings.tag.clone()),
            ],
            workspace_tar: workspace_tar.into(),
            script: script.into(),
            artifacts: PathBuf::new(),
            output: PathBuf::new(),
            log: PathBuf::new(),
            meta: vec![("type".to_string(), settings.meta_type.clone())],
        }
    }

    /// Directory the grid sends back
    #[must_use]
    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts = dir.into();
        self
    }

    /// Local tar file receiving the artifacts
    #[must_use]
    pub fn with_output(mut self, tar: impl Into<PathBuf>) -> Self {
        self.output = tar.into();
        self
    }

    /// Local log file of the remote run
    #[must_use]
    pub fn with_log(mut self, log: impl Into<PathBuf>) -> Self {
        self.log = log.into();
        self
    }

    /// Attach a `key=value` label to the job
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.push((key.into(), value.into()));
        self
    }

    /// Artifact tar file
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Remote log file
    pub fn log(&self) -> &Path {
        &self.log
    }

    /// Client command line
    pub fn command(&self) -> CommandLine {
        let mut cmd = CommandLine::new(&self.client).args(["-l", self.pool.as_str()]);
        for (key, value) in &self.env {
            cmd = cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd = cmd
            .arg("-w")
            .arg(self.workspace_tar.display().to_string())
            .arg("-c")
            .arg(&self.script)
            .arg("-a")
            .arg(self.artifacts.display().to_string())
            .arg("-o")
            .arg(self.output.display().to_string())
            .arg("--log")
            .arg(self.log.display().to_string());
        for (key, value) in &self.meta {
            cmd = cmd.arg("--meta").arg(format!("{key}={value}"));
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_command_arguments() {
        let job = GridJob::new(&GridSettings::default(), "release_ws/release_ws.tar", "make -j 4")
            .with_artifacts("release_ws/bin/arm64")
            .with_output("release_ws/arm64.tar")
            .with_log("release_ws/sg-arm64.log")
            .with_meta("config", "arm64");

        let cmd = job.command();
        assert_eq!(cmd.program(), "SimpleGridClient");
        let args = cmd.arguments().join(" ");
        assert!(args.starts_with("-l webstax "));
        assert!(args.contains("-e MCHP_DOCKER_NAME=ghcr.io/microchip-ung/bsp-buildenv"));
        assert!(args.contains("-e MCHP_DOCKER_TAG=1.9"));
        assert!(args.contains("-w release_ws/release_ws.tar"));
        assert!(args.contains("-c make -j 4"));
        assert!(args.contains("-a release_ws/bin/arm64"));
        assert!(args.contains("-o release_ws/arm64.tar"));
        assert!(args.contains("--log release_ws/sg-arm64.log"));
        assert!(args.ends_with("--meta type=mesa --meta config=arm64"));
        assert_eq!(job.output(), Path::new("release_ws/arm64.tar"));
    }

    #[test]
    fn test_script_is_a_single_argument() {
        let job = GridJob::new(&GridSettings::default(), "ws.tar", "(cd ws; make)");
        let cmd = job.command();
        let index = cmd.arguments().iter().position(|a| a == "-c").unwrap();
        assert_eq!(cmd.arguments()[index + 1], "(cd ws; make)");
    }
}
