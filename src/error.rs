//! Error types for shipyard
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// External command errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Process could not be started
    #[error("Running '{command}' failed to start: {error}")]
    Spawn { command: String, error: String },

    /// Non-zero exit status (or killed by a signal)
    #[error("CMD: {command} status: {}, std-err: {stderr}", .status.map_or_else(|| "signal".to_string(), |s| s.to_string()))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Exit status was zero but stderr was not empty (strict policy only)
    #[error("CMD: {command} status: 0, std-err: {stderr}")]
    Stderr { command: String, stderr: String },
}

impl CommandError {
    /// The command line that failed
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. }
            | Self::Failed { command, .. }
            | Self::Stderr { command, .. } => command,
        }
    }
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove a file or directory
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to create a symlink
    #[error("Failed to link '{link}' -> '{target}': {error}")]
    Symlink {
        target: PathBuf,
        link: PathBuf,
        error: String,
    },
}

/// Archive errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Failed to create an archive
    #[error("Failed to create archive '{path}': {error}")]
    Create { path: PathBuf, error: String },

    /// Failed to unpack an archive
    #[error("Failed to unpack archive '{path}' into '{dest}': {error}")]
    Unpack {
        path: PathBuf,
        dest: PathBuf,
        error: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file missing
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be parsed
    #[error("Failed to parse '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Preset not defined
    #[error("Preset '{name}' not found. Valid presets: {}", .available.join(", "))]
    UnknownPreset {
        name: String,
        available: Vec<String>,
    },

    /// Preset lacks an attribute needed for the requested operation
    #[error("Preset '{preset}' has no '{field}' attribute")]
    MissingField { preset: String, field: String },

    /// Internal tooling requested but not available
    #[error("Internal checks requested but internal tools are not available ({tool})")]
    InternalToolsUnavailable { tool: String },

    /// Invalid value
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Source repository errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Not a repository
    #[error("Invalid repository at '{path}': {error}")]
    InvalidRepository { path: PathBuf, error: String },

    /// HEAD could not be resolved
    #[error("Failed to resolve HEAD in '{path}': {error}")]
    Head { path: PathBuf, error: String },
}

/// Result tree file errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// Read or write failed
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// Invalid JSON content
    #[error("Failed to parse result tree '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Serialization failed
    #[error("Failed to serialize result tree: {0}")]
    Serialize(String),
}

/// Top-level shipyard error type
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// External command failed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Archive error
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Result tree file error
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Source repository error
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Broken invariant inside shipyard itself
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReleaseError {
    /// Whether this error is a failure of an external effect that a step may
    /// absorb. Configuration and internal errors are never absorbed.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            Self::Command(_) | Self::Filesystem(_) | Self::Archive(_) | Self::Report(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display_includes_command_and_stderr() {
        let err = CommandError::Failed {
            command: "make -j 4".to_string(),
            status: Some(2),
            stderr: "no rule".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("make -j 4"));
        assert!(msg.contains("status: 2"));
        assert!(msg.contains("no rule"));
        assert_eq!(err.command(), "make -j 4");
    }

    #[test]
    fn test_command_error_signal_status() {
        let err = CommandError::Failed {
            command: "sleep 100".to_string(),
            status: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("status: signal"));
    }

    #[test]
    fn test_step_failure_classification() {
        let cmd: ReleaseError = CommandError::Stderr {
            command: "cc".to_string(),
            stderr: "warning".to_string(),
        }
        .into();
        assert!(cmd.is_step_failure());

        let fs: ReleaseError = FilesystemError::ReadFile {
            path: PathBuf::from("x"),
            error: "missing".to_string(),
        }
        .into();
        assert!(fs.is_step_failure());

        let cfg: ReleaseError = ConfigError::Invalid {
            message: "bad".to_string(),
        }
        .into();
        assert!(!cfg.is_step_failure());

        assert!(!ReleaseError::Internal("bug".to_string()).is_step_failure());
    }

    #[test]
    fn test_unknown_preset_lists_available() {
        let err = ConfigError::UnknownPreset {
            name: "mips".to_string(),
            available: vec!["arm64".to_string(), "x86".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Preset 'mips' not found. Valid presets: arm64, x86"
        );
    }
}
