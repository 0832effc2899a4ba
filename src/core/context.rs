//! Release options and shared context
//!
//! [`ReleaseOptions`] holds the normalized command-line switches,
//! [`WorkspaceLayout`] the directory names derived from the release
//! configuration, and [`ReleaseContext`] bundles everything a release worker
//! needs. The context is immutable once built and shared between workers.

use std::path::{Path, PathBuf};

use crate::config::{defaults, PresetSet, ReleaseConfig};
use crate::error::{ConfigError, FilesystemError};
use crate::infra::command::CommandRunner;
use crate::infra::filesystem;
use crate::infra::toolchain::PackageInstaller;

/// Release switches after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Compile presets concurrently
    pub parallel: bool,
    /// Dispatch compiles to the build grid
    pub simplegrid: bool,
    /// Run the native build (false keeps only package installation)
    pub compile: bool,
    /// Run checks that need internal tooling
    pub internal_checks: bool,
    /// Branch name override
    pub branch: Option<String>,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            simplegrid: false,
            compile: true,
            internal_checks: false,
            branch: None,
        }
    }
}

impl ReleaseOptions {
    /// Create options with defaults (sequential, compiling, no internal checks)
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile presets concurrently
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compile on the build grid
    #[must_use]
    pub fn with_simplegrid(mut self, simplegrid: bool) -> Self {
        self.simplegrid = simplegrid;
        self
    }

    /// Skip the native build
    #[must_use]
    pub fn with_no_compile(mut self, no_compile: bool) -> Self {
        self.compile = !no_compile;
        self
    }

    /// Run internal checks
    #[must_use]
    pub fn with_internal_checks(mut self, internal_checks: bool) -> Self {
        self.internal_checks = internal_checks;
        self
    }

    /// Override the branch name
    #[must_use]
    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch.filter(|b| !b.is_empty());
        self
    }

    /// Apply the implications between switches.
    ///
    /// The grid implies parallel compiles. Skipping the compile is only honored
    /// when the internal tools exist and then turns on the internal checks.
    /// Asking for internal checks without the tools is an error.
    pub fn normalize(mut self, internal_tools: bool) -> Result<Self, ConfigError> {
        if self.simplegrid {
            self.parallel = true;
        }
        if !self.compile {
            if internal_tools {
                self.internal_checks = true;
            } else {
                self.compile = true;
            }
        }
        if self.internal_checks && !internal_tools {
            return Err(ConfigError::InternalToolsUnavailable {
                tool: "licenses/release_note".to_string(),
            });
        }
        Ok(self)
    }
}

/// Directories of one release run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    top: PathBuf,
    workspace_name: String,
    output: PathBuf,
    companion: String,
}

impl WorkspaceLayout {
    /// Layout for the checkout at `top`
    pub fn new(top: impl Into<PathBuf>, config: &ReleaseConfig) -> Self {
        let top = top.into();
        Self {
            output: top.join(&config.output_dir),
            workspace_name: config.workspace.clone(),
            companion: config.companion.dir.clone(),
            top,
        }
    }

    /// Checkout root
    pub fn top(&self) -> &Path {
        &self.top
    }

    /// Workspace directory name
    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    /// Workspace directory
    pub fn workspace(&self) -> PathBuf {
        self.top.join(&self.workspace_name)
    }

    /// Output directory (images, logs, reports)
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Source tarball inside the workspace
    pub fn workspace_tar(&self) -> PathBuf {
        self.workspace().join(format!("{}.tar", self.workspace_name))
    }

    /// Build directory of a preset, relative to the workspace
    pub fn preset_dir(preset: &str) -> String {
        format!("bin/{preset}")
    }

    /// Directory holding all preset build directories
    pub fn binaries(&self) -> PathBuf {
        self.workspace().join("bin")
    }

    /// Companion bundle in the checkout
    pub fn companion_source(&self) -> PathBuf {
        self.top.join(&self.companion)
    }

    /// Companion bundle inside the workspace
    pub fn companion_workspace(&self) -> PathBuf {
        self.workspace().join(&self.companion)
    }

    /// Remove and recreate the workspace and the output directory
    pub fn prepare(&self) -> Result<(), FilesystemError> {
        filesystem::reset_dir(&self.workspace())?;
        filesystem::reset_dir(&self.output)
    }
}

/// Everything a release worker needs
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    /// Release configuration
    pub config: ReleaseConfig,
    /// Build presets
    pub presets: PresetSet,
    /// Directory layout
    pub layout: WorkspaceLayout,
    /// Normalized switches
    pub options: ReleaseOptions,
    /// Command runner logging into the output directory
    pub runner: CommandRunner,
    /// Package installer
    pub installer: PackageInstaller,
}

impl ReleaseContext {
    /// Build a context for the checkout at `top`
    pub fn new(
        top: impl Into<PathBuf>,
        config: ReleaseConfig,
        presets: PresetSet,
        options: ReleaseOptions,
    ) -> Self {
        let layout = WorkspaceLayout::new(top, &config);
        let runner = CommandRunner::new(layout.output()).with_working_dir(layout.top());
        let installer = PackageInstaller::new(&config.installer, &config.sdk_root);
        Self {
            config,
            presets,
            layout,
            options,
            runner,
            installer,
        }
    }

    /// Load both configuration files of the checkout at `top`
    pub fn load_configs(
        top: &Path,
        release_config: Option<&Path>,
        presets: Option<&Path>,
    ) -> Result<(ReleaseConfig, PresetSet), ConfigError> {
        let release_path = release_config.map_or_else(|| top.join(defaults::RELEASE_CONFIG), Path::to_path_buf);
        let presets_path = presets.map_or_else(|| top.join(defaults::PRESETS_CONFIG), Path::to_path_buf);
        let config = ReleaseConfig::load(&release_path)?;
        let presets = PresetSet::load(&presets_path)?;
        Ok((config, presets))
    }
}
