//! Release artifacts
//!
//! Source archive, companion bundle handling, release archives and image
//! copies. These are the structural parts of a release: any failure here
//! aborts it.

use std::path::PathBuf;

use crate::config::defaults;
use crate::core::context::{ReleaseContext, WorkspaceLayout};
use crate::core::prune::is_image_file;
use crate::error::ReleaseError;
use crate::infra::archive::{self, TarWriter};
use crate::infra::command::CommandLine;
use crate::infra::filesystem;
use crate::infra::git::SourceIdentity;

/// Install the companion bundle of every release preset and copy it into the
/// checkout. Returns the installed bundle names.
pub async fn install_companion(ctx: &ReleaseContext) -> Result<Vec<String>, ReleaseError> {
    let prefix = &ctx.config.companion.package;
    let mut installed = Vec::new();
    for (name, preset) in ctx.presets.release_presets(&ctx.config.targets) {
        let Some(package) = preset.companion_package(prefix) else {
            continue;
        };
        tracing::info!("Installing companion bundle {} for {name}", package.name);
        ctx.installer.install(&ctx.runner, &package, None).await?;
        filesystem::copy_dir_contents(
            &ctx.installer.package_dir(&package),
            &ctx.layout.companion_source(),
        )?;
        installed.push(package.name);
    }
    Ok(installed)
}

/// Build the source archive and populate the workspace.
///
/// HEAD is exported with `git archive`, unpacked, completed with the
/// companion bundle and the version stamp, then re-packed below
/// `<workspace>/`. The unpacked tree becomes the workspace content.
pub async fn create_source_archive(
    ctx: &ReleaseContext,
    identity: &SourceIdentity,
) -> Result<PathBuf, ReleaseError> {
    let layout = &ctx.layout;
    let ws_name = layout.workspace_name();
    let workspace = layout.workspace();
    let tar = layout.workspace_tar();
    let staging = workspace.join("tmp");

    ctx.runner
        .run(
            &CommandLine::new("git").args([
                "archive".to_string(),
                format!("--prefix={ws_name}/"),
                "--format=tar".to_string(),
                "-o".to_string(),
                tar.display().to_string(),
                "HEAD".to_string(),
            ]),
            None,
        )
        .await?;

    // Unpack aside: the tar lives inside the workspace it describes
    archive::unpack(&tar, &staging)?;
    let tree = staging.join(ws_name);

    let companion = layout.companion_source();
    if companion.is_dir() {
        filesystem::copy_recursive(&companion, &tree)?;
    }

    let stamp = workspace.join(&ctx.config.version_file);
    filesystem::write_file(&stamp, &identity.version_stamp(&ctx.config.product))?;

    let mut writer = TarWriter::create(&tar)?;
    writer.add_dir(&tree, ws_name)?;
    writer.add_file(&stamp, &format!("{ws_name}/{}", ctx.config.version_file))?;
    writer.finish()?;

    filesystem::copy_dir_contents(&tree, &workspace)?;
    filesystem::remove_all(&staging)?;
    tracing::info!("Source archive {} ready", tar.display());
    Ok(tar)
}

/// Refresh the companion bundle in the workspace with the released sources
pub fn refresh_companion(ctx: &ReleaseContext) -> Result<(), ReleaseError> {
    let workspace = ctx.layout.workspace();
    let companion = ctx.layout.companion_workspace();
    for path in &ctx.config.companion.remove {
        filesystem::remove_all(&companion.join(path))?;
    }
    for copy in &ctx.config.companion.refresh {
        filesystem::copy_recursive(&workspace.join(&copy.from), &companion.join(&copy.to))?;
    }
    Ok(())
}

/// Pack the companion bundle as the backward-compatibility archive and
/// remove it from the workspace. `None` when there is no bundle.
pub fn pack_check_archive(
    ctx: &ReleaseContext,
    release_name: &str,
) -> Result<Option<PathBuf>, ReleaseError> {
    let companion = ctx.layout.companion_workspace();
    if !companion.is_dir() {
        tracing::warn!("No companion bundle in the workspace, skipping the compatibility archive");
        return Ok(None);
    }
    refresh_companion(ctx)?;
    let path = ctx.layout.output().join(format!(
        "{release_name}{}.tar.gz",
        defaults::CHECK_ARCHIVE_SUFFIX
    ));
    archive::pack_dir(&companion, &path, release_name)?;
    filesystem::remove_all(&companion)?;
    Ok(Some(path))
}

/// Pack the workspace as the release archive
pub fn pack_release(ctx: &ReleaseContext, release_name: &str) -> Result<PathBuf, ReleaseError> {
    let path = ctx.layout.output().join(format!("{release_name}.tar.gz"));
    Ok(archive::pack_dir(&ctx.layout.workspace(), &path, release_name)?)
}

/// Copy the final images of every release preset into the output directory
pub fn copy_images(ctx: &ReleaseContext) -> Result<Vec<PathBuf>, ReleaseError> {
    let mut copied = Vec::new();
    let workspace = ctx.layout.workspace();
    for (name, _) in ctx.presets.release_presets(&ctx.config.targets) {
        let bin = workspace.join(WorkspaceLayout::preset_dir(&name));
        for image_dir in &ctx.config.prune.image_dirs {
            let dir = bin.join(image_dir);
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            let mut images: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(is_image_file))
                .collect();
            images.sort();
            for image in images {
                copied.push(filesystem::copy_into(&image, ctx.layout.output())?);
            }
        }
    }
    Ok(copied)
}
