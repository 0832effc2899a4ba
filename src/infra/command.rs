//! External command execution
//!
//! Every shell-out of the release pipeline goes through [`CommandRunner`]: it
//! captures stdout and stderr, appends both to a per-component log file in the
//! output directory and turns a failed invocation into a [`CommandError`].
//! Whether output on stderr alone counts as failure is chosen per call with
//! [`StderrPolicy`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::error::CommandError;

/// How to judge a command that exits with status zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrPolicy {
    /// Only the exit status decides
    #[default]
    Lenient,
    /// Non-empty stderr is a failure even with exit status zero
    Strict,
}

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    display: Option<String>,
}

impl CommandLine {
    /// Run `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            display: None,
        }
    }

    /// Run a script through `sh -c`
    pub fn shell(script: impl Into<String>) -> Self {
        let script = script.into();
        Self {
            display: Some(script.clone()),
            ..Self::new("sh").arg("-c").arg(script)
        }
    }

    /// Add an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if set
    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(display) = &self.display {
            return f.write_str(display);
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a successful command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit status
    pub status: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// Executes commands and keeps their logs
#[derive(Debug, Clone)]
pub struct CommandRunner {
    log_dir: PathBuf,
    default_dir: Option<PathBuf>,
}

impl CommandRunner {
    /// Create a runner writing logs into `log_dir`
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            default_dir: None,
        }
    }

    /// Working directory for commands that do not set their own
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_dir = Some(dir.into());
        self
    }

    /// Log file for a component (`build.log` or `build-<component>.log`)
    pub fn log_path(&self, component: Option<&str>) -> PathBuf {
        match component {
            Some(component) => self.log_dir.join(format!("build-{component}.log")),
            None => self.log_dir.join(defaults::BUILD_LOG),
        }
    }

    /// Run with the lenient policy
    pub async fn run(
        &self,
        command: &CommandLine,
        component: Option<&str>,
    ) -> Result<CommandOutput, CommandError> {
        self.execute(command, StderrPolicy::Lenient, component).await
    }

    /// Run with the strict policy
    pub async fn run_strict(
        &self,
        command: &CommandLine,
        component: Option<&str>,
    ) -> Result<CommandOutput, CommandError> {
        self.execute(command, StderrPolicy::Strict, component).await
    }

    /// Run a command, log its output and apply `policy`
    pub async fn execute(
        &self,
        command: &CommandLine,
        policy: StderrPolicy,
        component: Option<&str>,
    ) -> Result<CommandOutput, CommandError> {
        let rendered = command.to_string();
        tracing::info!("RUN: {rendered}");

        let mut process = tokio::process::Command::new(&command.program);
        process.args(&command.args);
        if let Some(dir) = command.cwd.as_ref().or(self.default_dir.as_ref()) {
            process.current_dir(dir);
        }
        for (key, value) in &command.env {
            process.env(key, value);
        }
        process.stdin(std::process::Stdio::null());

        let started = Instant::now();
        let output = process.output().await.map_err(|e| CommandError::Spawn {
            command: rendered.clone(),
            error: e.to_string(),
        })?;
        let elapsed = started.elapsed().as_secs_f64();

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code();

        tracing::info!(
            "RUN-Done: {rendered} -> {} in {elapsed:.3}s",
            code.map_or_else(|| "signal".to_string(), |c| c.to_string())
        );
        self.append_log(component, &rendered, code, elapsed, &stdout, &stderr)
            .await;

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: rendered,
                status: code,
                stderr,
            });
        }
        if policy == StderrPolicy::Strict && !stderr.trim().is_empty() {
            return Err(CommandError::Stderr {
                command: rendered,
                stderr,
            });
        }

        Ok(CommandOutput {
            status: code.unwrap_or_default(),
            stdout,
            stderr,
        })
    }

    async fn append_log(
        &self,
        component: Option<&str>,
        rendered: &str,
        code: Option<i32>,
        elapsed: f64,
        stdout: &str,
        stderr: &str,
    ) {
        let path = self.log_path(component);
        let mut entry = format!("RUN: {rendered}\n");
        entry.push_str(stdout);
        if !stdout.is_empty() && !stdout.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(stderr);
        if !stderr.is_empty() && !stderr.ends_with('\n') {
            entry.push('\n');
        }
        let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        entry.push_str(&format!("RUN-Done: {rendered} -> {status} in {elapsed:.3}s\n"));

        // One write per command so concurrent workers do not interleave lines
        let result = async {
            tokio::fs::create_dir_all(&self.log_dir).await?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(entry.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!("Failed to write command log {}: {e}", path.display());
        }
    }
}
