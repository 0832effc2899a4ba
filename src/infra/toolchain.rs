//! SDK and toolchain packages
//!
//! Installs BSP SDK, toolchain and companion packages through the configured
//! package installer and works out which toolchain an installed BSP SDK needs.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::{defaults, PackageRef, Preset};
use crate::error::{ConfigError, ReleaseError};
use crate::infra::command::{CommandLine, CommandRunner};
use crate::infra::filesystem;

/// Version stamp shipped inside an installed BSP SDK
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SdkVersionInfo {
    /// Toolchain version the SDK was built with
    pub toolchain: String,
    /// Toolchain branch
    #[serde(default)]
    pub toolchain_branch: Option<String>,
}

impl SdkVersionInfo {
    /// Parse the stamp file
    pub fn from_yaml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
        // Versions such as `2024.02` arrive as numbers
        let field = |key: &str| match value.get(key) {
            Some(serde_yaml::Value::String(s)) => Some(s.clone()),
            Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let toolchain = field("toolchain").ok_or_else(|| ConfigError::Parse {
            path: path.to_path_buf(),
            error: "missing 'toolchain' key".to_string(),
        })?;
        Ok(Self {
            toolchain,
            toolchain_branch: field("toolchain_branch"),
        })
    }

    /// Repository folder of the toolchain (`<version>-toolchain` unless the
    /// version already names one)
    pub fn toolchain_folder(&self) -> String {
        if self.toolchain.contains("toolchain") {
            self.toolchain.clone()
        } else {
            format!("{}-toolchain", self.toolchain)
        }
    }

    /// Toolchain package matching this SDK
    pub fn toolchain_package(&self) -> PackageRef {
        PackageRef::new(
            format!("toolchains/{}", self.toolchain_folder()),
            format!("{}-{}", defaults::TOOLCHAIN_PREFIX, self.toolchain),
        )
    }
}

/// Packages one preset builds with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackages {
    /// BSP SDK, for presets that use one
    pub brsdk: Option<PackageRef>,
    /// Toolchain
    pub toolchain: PackageRef,
    /// Toolchain branch
    pub toolchain_branch: Option<String>,
}

impl ResolvedPackages {
    /// Packages in install order
    pub fn all(&self) -> Vec<&PackageRef> {
        self.brsdk.iter().chain(std::iter::once(&self.toolchain)).collect()
    }
}

/// Installs packages below an SDK root
#[derive(Debug, Clone)]
pub struct PackageInstaller {
    installer: String,
    sdk_root: PathBuf,
}

impl PackageInstaller {
    /// Create an installer using `installer` (e.g. `sudo mscc-install-pkg`)
    pub fn new(installer: impl Into<String>, sdk_root: impl Into<PathBuf>) -> Self {
        Self {
            installer: installer.into(),
            sdk_root: sdk_root.into(),
        }
    }

    /// SDK root
    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// Installed location of a package
    pub fn package_dir(&self, package: &PackageRef) -> PathBuf {
        self.sdk_root.join(&package.name)
    }

    /// Whether a package is already installed
    pub fn is_installed(&self, package: &PackageRef) -> bool {
        self.package_dir(package).exists()
    }

    /// Shell command installing a package
    pub fn install_command(&self, package: &PackageRef) -> String {
        format!("{} -t {} {}", self.installer, package.tag, package.name)
    }

    /// Install a package
    pub async fn install(
        &self,
        runner: &CommandRunner,
        package: &PackageRef,
        component: Option<&str>,
    ) -> Result<(), ReleaseError> {
        tracing::info!("Installing {} ({})", package.name, package.tag);
        runner
            .run(&CommandLine::shell(self.install_command(package)), component)
            .await?;
        Ok(())
    }

    /// Install a package unless it is already present
    pub async fn ensure_installed(
        &self,
        runner: &CommandRunner,
        package: &PackageRef,
        component: Option<&str>,
    ) -> Result<bool, ReleaseError> {
        if self.is_installed(package) {
            tracing::debug!("{} already installed", package.name);
            return Ok(false);
        }
        self.install(runner, package, component).await?;
        Ok(true)
    }

    /// Read the version stamp of an installed BSP SDK
    pub fn sdk_version(&self, brsdk: &PackageRef) -> Result<SdkVersionInfo, ReleaseError> {
        let path = self.package_dir(brsdk).join(defaults::VERSION_FILE);
        let content = filesystem::read_file(&path)?;
        Ok(SdkVersionInfo::from_yaml(&path, &content)?)
    }

    /// Work out the packages of a preset. BSP SDK presets need the SDK
    /// installed first, its stamp names the toolchain.
    pub fn resolve(&self, name: &str, preset: &Preset) -> Result<ResolvedPackages, ReleaseError> {
        if let Some(brsdk) = preset.brsdk_package() {
            let info = self.sdk_version(&brsdk)?;
            return Ok(ResolvedPackages {
                toolchain: info.toolchain_package(),
                toolchain_branch: info.toolchain_branch.clone(),
                brsdk: Some(brsdk),
            });
        }
        let toolchain = preset.toolchain_package().ok_or_else(|| ConfigError::MissingField {
            preset: name.to_string(),
            field: "toolchain".to_string(),
        })?;
        Ok(ResolvedPackages {
            brsdk: None,
            toolchain,
            toolchain_branch: preset.toolchain_branch.clone(),
        })
    }

    /// Install everything a preset builds with; returns the resolved packages
    pub async fn install_preset(
        &self,
        runner: &CommandRunner,
        name: &str,
        preset: &Preset,
        only_missing: bool,
    ) -> Result<ResolvedPackages, ReleaseError> {
        if let Some(brsdk) = preset.brsdk_package() {
            self.install_one(runner, &brsdk, only_missing).await?;
        }
        let packages = self.resolve(name, preset)?;
        self.install_one(runner, &packages.toolchain, only_missing)
            .await?;
        Ok(packages)
    }

    async fn install_one(
        &self,
        runner: &CommandRunner,
        package: &PackageRef,
        only_missing: bool,
    ) -> Result<(), ReleaseError> {
        if only_missing {
            self.ensure_installed(runner, package, None).await?;
        } else {
            self.install(runner, package, None).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn brsdk_preset() -> Preset {
        Preset {
            arch: Some("arm64".to_string()),
            brsdk: Some("2024.02".to_string()),
            toolchainfile: Some("x86_64-linux/share/buildroot/toolchainfile.cmake".to_string()),
            ..Preset::default()
        }
    }

    fn installed_sdk(root: &Path, stamp: &str) {
        let dir = root.join("mscc-brsdk-arm64-2024.02");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(".mscc-version"), stamp).unwrap();
    }

    #[test]
    fn test_toolchain_folder() {
        let info = SdkVersionInfo {
            toolchain: "2024.02-105".to_string(),
            toolchain_branch: None,
        };
        assert_eq!(info.toolchain_folder(), "2024.02-105-toolchain");
        assert_eq!(
            info.toolchain_package(),
            PackageRef::new("toolchains/2024.02-105-toolchain", "mscc-toolchain-bin-2024.02-105")
        );

        let named = SdkVersionInfo {
            toolchain: "2024.02-toolchain".to_string(),
            toolchain_branch: None,
        };
        assert_eq!(named.toolchain_folder(), "2024.02-toolchain");
    }

    #[test]
    fn test_version_info_accepts_numbers() {
        let info = SdkVersionInfo::from_yaml(Path::new("v"), "toolchain: 2024.02\n").unwrap();
        assert_eq!(info.toolchain, "2024.02");
        assert!(SdkVersionInfo::from_yaml(Path::new("v"), "other: 1\n").is_err());
    }

    #[test]
    fn test_install_command() {
        let installer = PackageInstaller::new("sudo /usr/local/bin/mscc-install-pkg", "/opt/mscc");
        let cmd = installer.install_command(&PackageRef::new("brsdk/2024.02", "mscc-brsdk-arm64-2024.02"));
        assert_eq!(
            cmd,
            "sudo /usr/local/bin/mscc-install-pkg -t brsdk/2024.02 mscc-brsdk-arm64-2024.02"
        );
    }

    #[test]
    fn test_resolve_brsdk_preset_reads_stamp() {
        let temp = TempDir::new().unwrap();
        installed_sdk(temp.path(), "toolchain: \"2024.02-105\"\ntoolchain_branch: toolchain\n");
        let installer = PackageInstaller::new("true", temp.path());

        let packages = installer.resolve("arm64", &brsdk_preset()).unwrap();
        assert_eq!(packages.brsdk.as_ref().unwrap().name, "mscc-brsdk-arm64-2024.02");
        assert_eq!(packages.toolchain.name, "mscc-toolchain-bin-2024.02-105");
        assert_eq!(packages.toolchain_branch.as_deref(), Some("toolchain"));
        assert_eq!(packages.all().len(), 2);
    }

    #[test]
    fn test_resolve_brsdk_without_stamp_fails() {
        let temp = TempDir::new().unwrap();
        let installer = PackageInstaller::new("true", temp.path());
        let err = installer.resolve("arm64", &brsdk_preset()).unwrap_err();
        assert!(matches!(err, ReleaseError::Filesystem(_)));
    }

    #[test]
    fn test_resolve_toolchain_preset() {
        let installer = PackageInstaller::new("true", "/opt/mscc");
        let preset = Preset {
            toolchain: Some("2024.02-105".to_string()),
            toolchain_branch: Some("toolchain".to_string()),
            ..Preset::default()
        };
        let packages = installer.resolve("x86", &preset).unwrap();
        assert!(packages.brsdk.is_none());
        assert_eq!(packages.toolchain.tag, "toolchains/2024.02-105-toolchain");

        let err = installer.resolve("bare", &Preset::default()).unwrap_err();
        assert!(matches!(err, ReleaseError::Config(ConfigError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_ensure_installed_skips_present_packages() {
        let temp = TempDir::new().unwrap();
        installed_sdk(temp.path(), "toolchain: tc\n");
        let runner = CommandRunner::new(temp.path().join("images"));
        let installer = PackageInstaller::new("false", temp.path());

        let brsdk = brsdk_preset().brsdk_package().unwrap();
        let installed = installer.ensure_installed(&runner, &brsdk, None).await.unwrap();
        assert!(!installed);

        let missing = PackageRef::new("toolchains/tc-toolchain", "mscc-toolchain-bin-tc");
        let result = installer.ensure_installed(&runner, &missing, None).await;
        assert!(matches!(result, Err(ReleaseError::Command(_))));
    }
}
