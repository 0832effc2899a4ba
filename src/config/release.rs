//! Release configuration (`.cmake/release.yaml`)
//!
//! Everything the release pipeline needs to know that is not part of a build
//! preset: product naming, directory names, the package installer, the grid
//! client, generator tools and the artifact pruning rules.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::error::ConfigError;

/// Top-level layout of the release configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseFile {
    /// Release settings
    #[serde(default)]
    pub conf: ReleaseConfig,
}

/// Release settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Product name used in archive names and the version stamp
    pub product: String,
    /// Friendly name of the previous release
    pub friendly_name_prv: String,
    /// Friendly name of the current release (e.g. `MEPA-2024.03`)
    pub friendly_name_cur: String,
    /// Output directory for images, logs and reports
    pub output_dir: String,
    /// Release workspace directory
    pub workspace: String,
    /// Result tree file name
    pub json_status: String,
    /// Rendered report file name
    pub html_status: String,
    /// Result tree file produced by the release-note generator
    pub json_status_release_note: String,
    /// Name of the root result node
    pub report_name: String,
    /// Version stamp file name
    pub version_file: String,
    /// Root of installed SDK packages
    pub sdk_root: PathBuf,
    /// Package installer invocation
    pub installer: String,
    /// Presets to release; empty releases every preset flagged `release_artifact`
    pub targets: Vec<String>,
    /// Native build settings
    pub build: BuildSettings,
    /// Distributed build grid
    pub grid: GridSettings,
    /// Companion SDK bundle
    pub companion: CompanionSettings,
    /// External tools
    pub tools: ToolSettings,
    /// Documentation generator jobs
    pub docs: Vec<DocJob>,
    /// Named command steps run after compilation
    pub post_build: Vec<CommandStep>,
    /// Artifact pruning
    pub prune: PruneSettings,
    /// Upload of aggregated artifacts
    pub upload: Option<UploadSettings>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            product: "sdk".to_string(),
            friendly_name_prv: String::new(),
            friendly_name_cur: String::new(),
            output_dir: defaults::OUTPUT_DIR.to_string(),
            workspace: defaults::WORKSPACE.to_string(),
            json_status: defaults::STATUS_JSON.to_string(),
            html_status: defaults::STATUS_HTML.to_string(),
            json_status_release_note: "release_note_status.json".to_string(),
            report_name: defaults::REPORT_NAME.to_string(),
            version_file: defaults::VERSION_FILE.to_string(),
            sdk_root: PathBuf::from(defaults::SDK_ROOT),
            installer: defaults::INSTALLER.to_string(),
            targets: Vec::new(),
            build: BuildSettings::default(),
            grid: GridSettings::default(),
            companion: CompanionSettings::default(),
            tools: ToolSettings::default(),
            docs: Vec::new(),
            post_build: Vec::new(),
            prune: PruneSettings::default(),
            upload: None,
        }
    }
}

/// Native build settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildSettings {
    /// CMake binary overriding the preset's SDK-provided one
    pub cmake: Option<String>,
    /// Make binary (default `make`)
    pub make: Option<String>,
    /// Parallel make jobs (default: number of CPUs)
    pub jobs: Option<usize>,
}

impl BuildSettings {
    /// Make invocation
    pub fn make(&self) -> &str {
        self.make.as_deref().unwrap_or("make")
    }

    /// Make job count
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Distributed build grid settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridSettings {
    /// Grid client command
    pub client: String,
    /// Worker pool
    pub pool: String,
    /// Container image name
    pub image: String,
    /// Container image tag
    pub tag: String,
    /// `type=` metadata attached to grid jobs
    pub meta_type: String,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            client: defaults::GRID_CLIENT.to_string(),
            pool: defaults::GRID_POOL.to_string(),
            image: defaults::GRID_IMAGE.to_string(),
            tag: defaults::GRID_IMAGE_TAG.to_string(),
            meta_type: "mesa".to_string(),
        }
    }
}

/// A directory copy `from` (relative to the source) `to` (relative to the destination)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CopySpec {
    /// Source path
    pub from: String,
    /// Destination path
    pub to: String,
}

/// Companion SDK bundle settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompanionSettings {
    /// Directory (relative to the checkout and the workspace) holding the bundle
    pub dir: String,
    /// Package name prefix of the bundle
    pub package: String,
    /// Paths inside the bundle removed before the compatibility refresh
    pub remove: Vec<String>,
    /// Workspace paths copied into the bundle before the compatibility archive
    pub refresh: Vec<CopySpec>,
    /// Checkout paths copied over the bundle by `shipyard-project`
    pub overlays: Vec<CopySpec>,
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            dir: "sw-mesa".to_string(),
            package: "mesa".to_string(),
            remove: Vec::new(),
            refresh: Vec::new(),
            overlays: Vec::new(),
        }
    }
}

/// External generator tools, relative to the checkout root
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolSettings {
    /// Copyright/license header checker
    pub copyright: Option<String>,
    /// Release note generator (internal tooling)
    pub release_note: Option<String>,
    /// License manifest generator (internal tooling)
    pub licenses: Option<String>,
    /// Interpreter candidates for documentation generators
    pub interpreters: Vec<String>,
}

/// Documentation generator job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocJob {
    /// Directory (relative to the source root) the generator runs in
    pub scripts_dir: String,
    /// Generator script, relative to `scripts_dir`
    #[serde(default = "default_doc_generator")]
    pub generator: String,
    /// Generated document, relative to the source root
    pub output: String,
}

fn default_doc_generator() -> String {
    "./dg.rb".to_string()
}

/// Named step made of shell commands (run in the checkout root)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandStep {
    /// Step name shown in the report
    pub name: String,
    /// Log component
    #[serde(default)]
    pub log: Option<String>,
    /// Shell commands; `{ws}` and `{output}` are substituted
    pub commands: Vec<String>,
}

/// Artifact pruning settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PruneSettings {
    /// Directories (relative to a preset's binary dir) holding final images
    pub image_dirs: Vec<String>,
    /// Additional directory names removed from binaries
    pub dirs: Vec<String>,
    /// File name fragments removed from binaries
    pub name_patterns: Vec<String>,
}

/// Upload settings for aggregated artifacts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSettings {
    /// Upload command; the archive path is appended
    pub command: String,
    /// Extra arguments placed before the archive path
    #[serde(default)]
    pub args: Vec<String>,
}

impl ReleaseConfig {
    /// Load the release configuration from a YAML file
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
        Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse the release configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: ReleaseFile = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<yaml>"),
            error: e.to_string(),
        })?;
        let config = file.conf;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.product.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "conf.product must not be empty".to_string(),
            });
        }
        if self.workspace.trim().is_empty() || self.workspace.contains('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "conf.workspace must be a plain directory name, got '{}'",
                    self.workspace
                ),
            });
        }
        Ok(())
    }

    /// Whether the internal tooling (release notes, license manifests) is configured
    /// and present in the checkout
    pub fn internal_tools_available(&self, top: &Path) -> bool {
        match (&self.tools.licenses, &self.tools.release_note) {
            (Some(licenses), Some(release_note)) => {
                top.join(licenses).is_file() && top.join(release_note).is_file()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
conf:
  product: mepa
  friendly_name_prv: MEPA-2023.12
  friendly_name_cur: MEPA-2024.03
  json_status_release_note: release_note.json
  targets: [arm64]
  build:
    jobs: 10
  docs:
    - scripts_dir: mepa/docs/scripts
      output: mepa/mepa-doc.html
  post_build:
    - name: Update CapDB
      log: capdb
      commands: ["true"]
"#;

    #[test]
    fn test_parse_release_config() {
        let config = ReleaseConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.product, "mepa");
        assert_eq!(config.friendly_name_cur, "MEPA-2024.03");
        assert_eq!(config.targets, vec!["arm64".to_string()]);
        assert_eq!(config.build.jobs(), 10);
        assert_eq!(config.build.make(), "make");
        assert_eq!(config.docs[0].generator, "./dg.rb");
        assert_eq!(config.post_build[0].log.as_deref(), Some("capdb"));
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ReleaseConfig::from_yaml("conf:\n  product: mepa\n").unwrap();
        assert_eq!(config.output_dir, "images");
        assert_eq!(config.workspace, "release_ws");
        assert_eq!(config.json_status, "status.json");
        assert_eq!(config.report_name, "API");
        assert_eq!(config.sdk_root, PathBuf::from("/opt/mscc"));
        assert!(config.upload.is_none());
    }

    #[test]
    fn test_rejects_nested_workspace() {
        let result = ReleaseConfig::from_yaml("conf:\n  product: x\n  workspace: a/b\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = ReleaseConfig::load(&temp.path().join("release.yaml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("release.yaml");
        std::fs::write(&path, "conf: [unclosed").unwrap();
        match ReleaseConfig::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_internal_tools_available() {
        let temp = TempDir::new().unwrap();
        let mut config = ReleaseConfig::default();
        assert!(!config.internal_tools_available(temp.path()));

        config.tools.licenses = Some("tools/licenses.rb".to_string());
        config.tools.release_note = Some("tools/release_note.rb".to_string());
        assert!(!config.internal_tools_available(temp.path()));

        std::fs::create_dir_all(temp.path().join("tools")).unwrap();
        std::fs::write(temp.path().join("tools/licenses.rb"), "").unwrap();
        std::fs::write(temp.path().join("tools/release_note.rb"), "").unwrap();
        assert!(config.internal_tools_available(temp.path()));
    }
}
