//! Artifact aggregation
//!
//! Combines a released workspace with binaries built elsewhere into a
//! single distributable archive and hands it to the upload command.

use std::path::{Path, PathBuf};

use crate::config::{defaults, ReleaseConfig};
use crate::core::prune::is_image_file;
use crate::error::{ConfigError, ReleaseError};
use crate::infra::archive;
use crate::infra::command::{CommandLine, CommandRunner};
use crate::infra::filesystem;
use crate::infra::git::SourceIdentity;

/// What an aggregation produced
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// `<product>-<git_id>@<branch>`
    pub name: String,
    /// Archive in the checkout
    pub archive: PathBuf,
    /// Images copied into the output directory
    pub images: Vec<PathBuf>,
    /// Whether the upload command ran
    pub uploaded: bool,
}

/// Aggregates a workspace and a binaries tar
#[derive(Debug, Clone)]
pub struct Aggregator {
    top: PathBuf,
    config: ReleaseConfig,
    runner: CommandRunner,
    workspace: String,
    binaries: String,
}

impl Aggregator {
    /// Aggregator for the checkout at `top`
    pub fn new(top: impl Into<PathBuf>, config: ReleaseConfig) -> Self {
        let top = top.into();
        let runner = CommandRunner::new(top.join(&config.output_dir)).with_working_dir(&top);
        Self {
            top,
            config,
            runner,
            workspace: defaults::AGGREGATE_WORKSPACE.to_string(),
            binaries: defaults::AGGREGATE_BINARIES.to_string(),
        }
    }

    /// Workspace directory name (default `ws`)
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Binaries tar name (default `arm64.tar`)
    #[must_use]
    pub fn with_binaries(mut self, binaries: impl Into<String>) -> Self {
        self.binaries = binaries.into();
        self
    }

    fn output_dir(&self) -> PathBuf {
        self.top.join(&self.config.output_dir)
    }

    /// Architecture directory the binaries tar unpacks to (`arm64.tar` holds `arm64/`)
    fn arch(&self) -> &str {
        Path::new(&self.binaries)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.binaries)
    }

    /// Release identifier from `git describe --tags --long`, falling back to
    /// the abbreviated commit id
    pub async fn describe(&self, identity: &SourceIdentity) -> String {
        let cmd = CommandLine::new("git").args(["describe", "--tags", "--long"]);
        match self.runner.run(&cmd, None).await {
            Ok(output) if !output.stdout.trim().is_empty() => output.stdout.trim().to_string(),
            Ok(_) => identity.sha.clone(),
            Err(e) => {
                tracing::warn!("git describe failed, using {}: {e}", identity.sha);
                identity.sha.clone()
            }
        }
    }

    /// Aggregate and upload
    pub async fn run(&self, branch: Option<&str>) -> Result<AggregateOutcome, ReleaseError> {
        let workspace = self.top.join(&self.workspace);
        if !workspace.is_dir() {
            return Err(ConfigError::Invalid {
                message: format!("no workspace at {}", workspace.display()),
            }
            .into());
        }

        // Command logs create the output directory, decide before running any
        let output_dir = self.output_dir();
        let publish = output_dir.is_dir();

        let identity = SourceIdentity::resolve(&self.top, branch)?;
        let git_id = self.describe(&identity).await;
        let identity = identity.with_git_id(git_id);
        let name = identity.release_name(&self.config.product);
        tracing::info!("Aggregating {name}");

        let staging = self.top.join(&name);
        filesystem::remove_all(&staging)?;
        filesystem::copy_dir_contents(&workspace, &staging)?;
        let bin = staging.join("bin");
        filesystem::create_dir_all(&bin)?;
        archive::unpack(&self.top.join(&self.binaries), &bin)?;

        let archive = self.top.join(format!("{name}.tar.gz"));
        archive::pack_dir(&staging, &archive, &name)?;

        let mut images = Vec::new();
        if publish {
            for image_dir in &self.config.prune.image_dirs {
                let dir = bin.join(self.arch()).join(image_dir);
                images.extend(copy_images(&dir, &output_dir)?);
            }
        }
        filesystem::remove_all(&staging)?;

        let uploaded = match &self.config.upload {
            Some(upload) => {
                let cmd = CommandLine::new(&upload.command)
                    .args(upload.args.iter().cloned())
                    .arg(archive.display().to_string());
                self.runner.run(&cmd, Some("upload")).await?;
                true
            }
            None => {
                tracing::info!("No upload command configured");
                false
            }
        };

        if publish {
            filesystem::copy_into(&archive, &output_dir)?;
        }

        Ok(AggregateOutcome {
            name,
            archive,
            images,
            uploaded,
        })
    }
}

fn copy_images(dir: &Path, output: &Path) -> Result<Vec<PathBuf>, ReleaseError> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(Vec::new());
    };
    let mut images: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(is_image_file))
        .collect();
    images.sort();
    let mut copied = Vec::with_capacity(images.len());
    for image in images {
        copied.push(filesystem::copy_into(&image, output)?);
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_arch_from_binaries_tar() {
        let aggregator = Aggregator::new("/src", ReleaseConfig::default());
        assert_eq!(aggregator.arch(), "arm64");
        assert_eq!(aggregator.with_binaries("riscv.tar").arch(), "riscv");
    }

    #[tokio::test]
    async fn test_missing_workspace_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Aggregator::new(temp.path(), ReleaseConfig::default())
            .run(Some("main"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_copy_images_filters_and_tolerates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("mepa_demo");
        let out = temp.path().join("images");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(dir.join("mepa_demo.itb"), "fit").unwrap();
        std::fs::write(dir.join("mepa_demo"), "elf").unwrap();

        let copied = copy_images(&dir, &out).unwrap();
        assert_eq!(copied, vec![out.join("mepa_demo.itb")]);
        assert!(copy_images(&temp.path().join("missing"), &out).unwrap().is_empty());
    }
}
