//! Build presets (`.cmake/cmake-presets.yaml`)
//!
//! A preset names an architecture plus the SDK or toolchain it builds with.
//! This module derives package names, install references and CMake arguments
//! from a preset; it performs no I/O besides loading the file.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::error::ConfigError;

/// Top-level layout of the preset file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PresetFile {
    /// Presets by name
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
}

/// A named build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preset {
    /// Target architecture
    #[serde(deserialize_with = "scalar")]
    pub arch: Option<String>,
    /// Toolchain version (presets without a BSP SDK)
    #[serde(deserialize_with = "scalar")]
    pub toolchain: Option<String>,
    /// Toolchain branch
    #[serde(deserialize_with = "scalar")]
    pub toolchain_branch: Option<String>,
    /// BSP SDK version
    #[serde(deserialize_with = "scalar")]
    pub brsdk: Option<String>,
    /// BSP SDK branch
    #[serde(deserialize_with = "scalar")]
    pub brsdk_branch: Option<String>,
    /// Architecture directory inside the toolchain (license manifests)
    #[serde(deserialize_with = "scalar")]
    pub brsdk_arch: Option<String>,
    /// CMake toolchain file, relative to the SDK base
    #[serde(deserialize_with = "scalar")]
    pub toolchainfile: Option<String>,
    /// CMake binary, relative to the SDK base
    #[serde(deserialize_with = "scalar")]
    pub cmake: Option<String>,
    /// Extra CMake flags
    #[serde(deserialize_with = "scalar")]
    pub cmake_flags: Option<String>,
    /// Legal-info directory, relative to the SDK base
    #[serde(deserialize_with = "scalar")]
    pub legal: Option<String>,
    /// Whether this preset produces a release artifact
    pub release_artifact: bool,
    /// Companion bundle version
    #[serde(deserialize_with = "scalar")]
    pub mesa: Option<String>,
    /// Companion bundle build id
    #[serde(deserialize_with = "scalar")]
    pub mesa_id: Option<String>,
    /// Companion bundle branch
    #[serde(deserialize_with = "scalar")]
    pub mesa_branch: Option<String>,
}

/// Accept YAML strings, numbers and booleans as strings (`brsdk: 2024.02`)
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar value, got {other:?}"
            )))
        }
    })
}

/// Reference to an installable package: repository tag plus local name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Tag passed to the installer (`brsdk/2024.02`)
    pub tag: String,
    /// Installed package name (directory under the SDK root)
    pub name: String,
}

impl PackageRef {
    /// Create a package reference
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
        }
    }
}

impl Preset {
    /// Whether this preset builds on a BSP SDK (as opposed to a bare toolchain)
    pub fn uses_brsdk(&self) -> bool {
        self.brsdk.is_some()
    }

    fn arch(&self) -> &str {
        self.arch.as_deref().unwrap_or_default()
    }

    /// Installed name of the BSP SDK, if the preset uses one
    pub fn brsdk_package_name(&self) -> Option<String> {
        let brsdk = self.brsdk.as_deref()?;
        let mut name = format!("{}-{}-{brsdk}", defaults::BRSDK_PREFIX, self.arch());
        if let Some(branch) = self.brsdk_branch.as_deref() {
            if branch != defaults::DEFAULT_BRSDK_BRANCH {
                name.push('-');
                name.push_str(branch);
            }
        }
        Some(name)
    }

    /// Installed name of the preset's own toolchain
    pub fn toolchain_package_name(&self) -> Option<String> {
        let toolchain = self.toolchain.as_deref()?;
        let mut name = format!("{}-{toolchain}", defaults::TOOLCHAIN_PREFIX);
        if let Some(branch) = self.toolchain_branch.as_deref() {
            if branch != defaults::DEFAULT_TOOLCHAIN_BRANCH {
                name.push('-');
                name.push_str(branch);
            }
        }
        Some(name)
    }

    /// BSP SDK install reference
    pub fn brsdk_package(&self) -> Option<PackageRef> {
        let brsdk = self.brsdk.as_deref()?;
        let name = self.brsdk_package_name()?;
        let tag = match self.brsdk_branch.as_deref() {
            Some(branch) => format!("brsdk/{brsdk}-{branch}"),
            None => format!("brsdk/{brsdk}"),
        };
        Some(PackageRef::new(tag, name))
    }

    /// Toolchain install reference for presets without a BSP SDK
    pub fn toolchain_package(&self) -> Option<PackageRef> {
        let toolchain = self.toolchain.as_deref()?;
        let name = self.toolchain_package_name()?;
        let branch = self
            .toolchain_branch
            .as_deref()
            .unwrap_or(defaults::DEFAULT_TOOLCHAIN_BRANCH);
        Some(PackageRef::new(format!("toolchains/{toolchain}-{branch}"), name))
    }

    /// Companion bundle install reference (`<prefix>/<ver>-<id>@<branch>`)
    pub fn companion_package(&self, prefix: &str) -> Option<PackageRef> {
        let version = self.mesa.as_deref()?;
        let mut coordinates = version.to_string();
        if let Some(id) = self.mesa_id.as_deref() {
            coordinates.push('-');
            coordinates.push_str(id);
        }
        if let Some(branch) = self.mesa_branch.as_deref() {
            coordinates.push('@');
            coordinates.push_str(branch);
        }
        Some(PackageRef::new(
            format!("{prefix}/{coordinates}"),
            format!("{prefix}-{coordinates}"),
        ))
    }

    /// Installed base directory of the SDK (or toolchain) the preset builds with
    pub fn sdk_base(&self, sdk_root: &Path) -> Option<PathBuf> {
        self.brsdk_package_name()
            .or_else(|| self.toolchain_package_name())
            .map(|name| sdk_root.join(name))
    }

    /// `-DCMAKE_TOOLCHAIN_FILE=...` argument
    pub fn toolchain_file_arg(&self, name: &str, sdk_root: &Path) -> Result<String, ConfigError> {
        let file = self
            .toolchainfile
            .as_deref()
            .ok_or_else(|| missing(name, "toolchainfile"))?;
        let base = self
            .sdk_base(sdk_root)
            .ok_or_else(|| missing(name, "toolchain"))?;
        Ok(format!(
            "-DCMAKE_TOOLCHAIN_FILE={}",
            base.join(file).display()
        ))
    }

    /// CMake binary shipped with the SDK, if the preset names one
    pub fn cmake_binary(&self, sdk_root: &Path) -> Option<PathBuf> {
        let cmake = self.cmake.as_deref()?;
        self.sdk_base(sdk_root).map(|base| base.join(cmake))
    }

    /// CMake option string (preset flags plus `-DBUILD_ALL=on`)
    pub fn cmake_options(&self) -> String {
        match self.cmake_flags.as_deref().map(str::trim) {
            Some(flags) if !flags.is_empty() => format!("{flags} {}", defaults::BUILD_ALL_FLAG),
            _ => defaults::BUILD_ALL_FLAG.to_string(),
        }
    }
}

fn missing(preset: &str, field: &str) -> ConfigError {
    ConfigError::MissingField {
        preset: preset.to_string(),
        field: field.to_string(),
    }
}

/// All presets defined for a checkout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetSet {
    presets: BTreeMap<String, Preset>,
}

impl PresetSet {
    /// Load presets from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let file: PresetFile = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(Self::from(file.presets))
    }

    /// Parse presets from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: PresetFile = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<yaml>"),
            error: e.to_string(),
        })?;
        Ok(Self::from(file.presets))
    }

    /// Look up a preset by name
    pub fn get(&self, name: &str) -> Result<&Preset, ConfigError> {
        self.presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// All preset names, sorted
    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    /// Presets producing release artifacts, restricted to `targets` when non-empty
    pub fn release_presets(&self, targets: &[String]) -> Vec<(String, Preset)> {
        self.presets
            .iter()
            .filter(|(_, preset)| preset.release_artifact)
            .filter(|(name, _)| targets.is_empty() || targets.iter().any(|t| t == *name))
            .map(|(name, preset)| (name.clone(), preset.clone()))
            .collect()
    }

    /// Number of presets
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Whether no preset is defined
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl From<BTreeMap<String, Preset>> for PresetSet {
    fn from(presets: BTreeMap<String, Preset>) -> Self {
        Self { presets }
    }
}
