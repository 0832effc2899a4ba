//! Developer build directories
//!
//! Creates a CMake build directory for one preset: installs the packages the
//! preset needs when they are missing, refreshes the companion bundle and runs
//! the CMake configure step.

use std::path::{Component, Path, PathBuf};

use crate::config::{Preset, PresetSet, ReleaseConfig};
use crate::core::build_script::configure_command;
use crate::error::ReleaseError;
use crate::infra::command::{CommandLine, CommandRunner};
use crate::infra::filesystem;
use crate::infra::toolchain::{PackageInstaller, ResolvedPackages};

/// Component name of the configure log
pub const CONFIGURE_LOG: &str = "configure";

/// Default build directory of a preset
pub fn default_build_dir(preset: &str) -> String {
    format!("build-{preset}")
}

/// Path leading from `from` back to `to`, when `from` lies below `to`;
/// otherwise `to` itself
pub fn relative_source(to: &Path, from: &Path) -> PathBuf {
    let Ok(rel) = from.strip_prefix(to) else {
        return to.to_path_buf();
    };
    let depth = rel
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    if depth == 0 {
        return PathBuf::from(".");
    }
    (0..depth).map(|_| "..").collect()
}

/// A configured build directory
#[derive(Debug, Clone)]
pub struct ProjectOutcome {
    /// Build directory
    pub build_dir: PathBuf,
    /// Packages the preset builds with
    pub packages: ResolvedPackages,
    /// CMake configure command that was run
    pub configure: String,
}

/// Creates build directories inside a checkout
#[derive(Debug, Clone)]
pub struct ProjectCreator {
    top: PathBuf,
    config: ReleaseConfig,
    presets: PresetSet,
    installer: PackageInstaller,
}

impl ProjectCreator {
    /// Creator for the checkout at `top`
    pub fn new(top: impl Into<PathBuf>, config: ReleaseConfig, presets: PresetSet) -> Self {
        let installer = PackageInstaller::new(&config.installer, &config.sdk_root);
        Self {
            top: top.into(),
            config,
            presets,
            installer,
        }
    }

    /// Names of all presets
    pub fn preset_names(&self) -> Vec<String> {
        self.presets.names()
    }

    /// Build directory for `preset`, relative paths taken from the checkout
    pub fn build_dir(&self, preset: &str, requested: Option<&Path>) -> PathBuf {
        match requested {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => self.top.join(dir),
            None => self.top.join(default_build_dir(preset)),
        }
    }

    /// Create and configure the build directory of `preset_name`
    pub async fn create(
        &self,
        preset_name: &str,
        requested: Option<&Path>,
    ) -> Result<ProjectOutcome, ReleaseError> {
        let preset = self.presets.get(preset_name)?.clone();
        let build_dir = self.build_dir(preset_name, requested);
        if build_dir.exists() {
            tracing::warn!("{} exists already, removing it", build_dir.display());
        }
        filesystem::reset_dir(&build_dir)?;

        let runner = CommandRunner::new(&build_dir).with_working_dir(&self.top);
        self.refresh_companion(&runner, &preset).await?;
        let packages = self
            .installer
            .install_preset(&runner, preset_name, &preset, true)
            .await?;

        let sdk_root = self.installer.sdk_root();
        let cmake = match preset.cmake_binary(sdk_root) {
            Some(binary) => {
                filesystem::symlink(&binary, &build_dir.join("cmake"))?;
                "./cmake".to_string()
            }
            None => "cmake".to_string(),
        };
        let source = relative_source(&self.top, &build_dir);
        let configure = configure_command(&cmake, preset_name, &preset, sdk_root, &source)?;
        runner
            .run(
                &CommandLine::shell(configure.clone()).current_dir(&build_dir),
                Some(CONFIGURE_LOG),
            )
            .await?;

        tracing::info!("Configured {} for {preset_name}", build_dir.display());
        Ok(ProjectOutcome {
            build_dir,
            packages,
            configure,
        })
    }

    /// Replace the companion bundle with a fresh install and lay the local
    /// overlays over it. Returns false when the preset has no bundle.
    async fn refresh_companion(
        &self,
        runner: &CommandRunner,
        preset: &Preset,
    ) -> Result<bool, ReleaseError> {
        let settings = &self.config.companion;
        let Some(package) = preset.companion_package(&settings.package) else {
            return Ok(false);
        };
        let companion = self.top.join(&settings.dir);
        filesystem::remove_all(&companion)?;
        self.installer.install(runner, &package, None).await?;
        filesystem::copy_dir_contents(&self.installer.package_dir(&package), &companion)?;

        for path in &settings.remove {
            filesystem::remove_all(&companion.join(path))?;
        }
        for overlay in &settings.overlays {
            let from = self.top.join(&overlay.from);
            let to = companion.join(&overlay.to);
            filesystem::remove_all(&to)?;
            filesystem::copy_recursive(&from, &to)?;
        }
        Ok(true)
    }
}
