//! Compile scripts
//!
//! A preset is compiled by one shell script run from the checkout root (or on
//! the grid). The script enters the preset's build directory, installs the
//! packages the preset builds with and, unless compiling is switched off,
//! configures and builds with CMake and make.

use std::path::Path;

use crate::config::release::BuildSettings;
use crate::config::Preset;
use crate::core::context::WorkspaceLayout;
use crate::error::ConfigError;
use crate::infra::toolchain::{PackageInstaller, ResolvedPackages};

/// Compile script of one preset
#[derive(Debug, Clone)]
pub struct CompileScript<'a> {
    name: &'a str,
    preset: &'a Preset,
    packages: &'a ResolvedPackages,
    installer: &'a PackageInstaller,
    build: &'a BuildSettings,
    workspace: &'a str,
}

impl<'a> CompileScript<'a> {
    /// Script for preset `name` inside the workspace directory `workspace`
    pub fn new(
        name: &'a str,
        preset: &'a Preset,
        packages: &'a ResolvedPackages,
        installer: &'a PackageInstaller,
        build: &'a BuildSettings,
        workspace: &'a str,
    ) -> Self {
        Self {
            name,
            preset,
            packages,
            installer,
            build,
            workspace,
        }
    }

    /// CMake binary: the configured override, the SDK's own, or `cmake` from PATH
    pub fn cmake(&self) -> String {
        if let Some(cmake) = &self.build.cmake {
            return cmake.clone();
        }
        self.preset
            .cmake_binary(self.installer.sdk_root())
            .map_or_else(|| "cmake".to_string(), |p| p.display().to_string())
    }

    /// Build commands run after the installs
    pub fn build_commands(&self) -> Result<String, ConfigError> {
        let cmake = self.cmake();
        let toolchain = self
            .preset
            .toolchain_file_arg(self.name, self.installer.sdk_root())?;
        Ok(format!(
            "{cmake} {toolchain} {} ../.. && {cmake} ../.. && {} -j {}",
            self.preset.cmake_options(),
            self.build.make(),
            self.build.jobs()
        ))
    }

    /// Render the script; `compile == false` keeps only the installs
    pub fn render(&self, compile: bool) -> Result<String, ConfigError> {
        let odir = WorkspaceLayout::preset_dir(self.name);
        let mut script = format!("(cd {}; mkdir -p {odir}; cd {odir}; ", self.workspace);
        for package in self.packages.all() {
            script.push_str(&self.installer.install_command(package));
            script.push_str("; ");
        }
        if compile {
            script.push_str(&self.build_commands()?);
        } else {
            script.push_str("true");
        }
        script.push(')');
        Ok(script)
    }
}

/// CMake configure command for a standalone project directory
pub fn configure_command(
    cmake: &str,
    name: &str,
    preset: &Preset,
    sdk_root: &Path,
    source: &Path,
) -> Result<String, ConfigError> {
    let toolchain = preset.toolchain_file_arg(name, sdk_root)?;
    let mut cmd = format!("{cmake} {toolchain}");
    if let Some(flags) = preset.cmake_flags.as_deref().map(str::trim) {
        if !flags.is_empty() {
            cmd.push(' ');
            cmd.push_str(flags);
        }
    }
    cmd.push(' ');
    cmd.push_str(&source.display().to_string());
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackageRef;

    fn preset() -> Preset {
        Preset {
            arch: Some("arm64".to_string()),
            brsdk: Some("2024.02".to_string()),
            toolchainfile: Some("x86_64-linux/share/buildroot/toolchainfile.cmake".to_string()),
            cmake: Some("x86_64-linux/bin/cmake".to_string()),
            cmake_flags: Some("-DCMAKE_BUILD_TYPE=Release".to_string()),
            ..Preset::default()
        }
    }

    fn packages() -> ResolvedPackages {
        ResolvedPackages {
            brsdk: Some(PackageRef::new("brsdk/2024.02", "mscc-brsdk-arm64-2024.02")),
            toolchain: PackageRef::new("toolchains/2024.02-toolchain", "mscc-toolchain-bin-2024.02"),
            toolchain_branch: None,
        }
    }

    fn build() -> BuildSettings {
        BuildSettings {
            jobs: Some(10),
            ..BuildSettings::default()
        }
    }

    #[test]
    fn test_full_compile_script() {
        let installer = PackageInstaller::new("install-pkg", "/opt/mscc");
        let (preset, packages, build) = (preset(), packages(), build());
        let script = CompileScript::new("arm64", &preset, &packages, &installer, &build, "release_ws")
            .render(true)
            .unwrap();

        assert!(script.starts_with("(cd release_ws; mkdir -p bin/arm64; cd bin/arm64; "));
        assert!(script.contains("install-pkg -t brsdk/2024.02 mscc-brsdk-arm64-2024.02; "));
        assert!(script.contains("install-pkg -t toolchains/2024.02-toolchain mscc-toolchain-bin-2024.02; "));
        assert!(script.contains(
            "/opt/mscc/mscc-brsdk-arm64-2024.02/x86_64-linux/bin/cmake \
             -DCMAKE_TOOLCHAIN_FILE=/opt/mscc/mscc-brsdk-arm64-2024.02/x86_64-linux/share/buildroot/toolchainfile.cmake \
             -DCMAKE_BUILD_TYPE=Release -DBUILD_ALL=on ../.."
        ));
        assert!(script.ends_with("&& make -j 10)"));
    }

    #[test]
    fn test_no_compile_keeps_only_installs() {
        let installer = PackageInstaller::new("install-pkg", "/opt/mscc");
        let (preset, packages, build) = (preset(), packages(), build());
        let script = CompileScript::new("arm64", &preset, &packages, &installer, &build, "release_ws")
            .render(false)
            .unwrap();

        assert!(script.contains("install-pkg -t brsdk/2024.02"));
        assert!(!script.contains("cmake"));
        assert!(!script.contains("make -j"));
    }

    #[test]
    fn test_cmake_override_and_missing_toolchain_file() {
        let installer = PackageInstaller::new("install-pkg", "/opt/mscc");
        let build = BuildSettings {
            cmake: Some("true".to_string()),
            make: Some("true".to_string()),
            jobs: Some(2),
        };
        let preset = preset();
        let packages = packages();
        let script = CompileScript::new("arm64", &preset, &packages, &installer, &build, "ws");
        assert_eq!(script.cmake(), "true");
        assert!(script.render(true).unwrap().ends_with("&& true -j 2)"));

        let bare = Preset {
            toolchainfile: None,
            ..preset
        };
        let script = CompileScript::new("arm64", &bare, &packages, &installer, &build, "ws");
        assert!(matches!(
            script.render(true),
            Err(ConfigError::MissingField { .. })
        ));
        assert!(script.render(false).is_ok());
    }

    #[test]
    fn test_configure_command() {
        let cmd = configure_command(
            "./cmake",
            "arm64",
            &preset(),
            Path::new("/opt/mscc"),
            Path::new(".."),
        )
        .unwrap();
        assert_eq!(
            cmd,
            "./cmake -DCMAKE_TOOLCHAIN_FILE=/opt/mscc/mscc-brsdk-arm64-2024.02/x86_64-linux/share/buildroot/toolchainfile.cmake -DCMAKE_BUILD_TYPE=Release .."
        );
    }
}
