//! Source and license checks
//!
//! Copyright checking, release notes and license manifests are produced by
//! external generator scripts living in the checkout. The functions here run
//! them with the right arguments and pick up their results; the caller wraps
//! each one in a step.

use std::path::PathBuf;

use crate::config::Preset;
use crate::core::context::{ReleaseContext, WorkspaceLayout};
use crate::core::result_tree::ResultNode;
use crate::error::{ConfigError, ReleaseError};
use crate::infra::command::CommandLine;
use crate::infra::filesystem;
use crate::infra::toolchain::ResolvedPackages;

fn tool_path(ctx: &ReleaseContext, tool: Option<&String>, field: &str) -> Result<PathBuf, ReleaseError> {
    let tool = tool.ok_or_else(|| ConfigError::MissingField {
        preset: "conf.tools".to_string(),
        field: field.to_string(),
    })?;
    Ok(ctx.layout.top().join(tool))
}

/// Run the copyright/license header checker over the checkout
pub async fn copyright(ctx: &ReleaseContext) -> Result<(), ReleaseError> {
    let Some(tool) = ctx.config.tools.copyright.as_ref() else {
        tracing::warn!("No copyright checker configured, skipping the check");
        return Ok(());
    };
    let script = ctx.layout.top().join(tool);
    ctx.runner
        .run(
            &CommandLine::new(script.display().to_string()),
            Some("copyright_check"),
        )
        .await?;
    Ok(())
}

/// Generate the release note and return the result subtree it reports.
///
/// The generator writes its own result tree into the output directory plus
/// `release_note_*.txt` files, which are copied into the workspace.
pub async fn release_note(ctx: &ReleaseContext) -> Result<ResultNode, ReleaseError> {
    let script = tool_path(ctx, ctx.config.tools.release_note.as_ref(), "release_note")?;
    ctx.runner
        .run(
            &CommandLine::new(script.display().to_string()),
            Some("release_note"),
        )
        .await?;

    let output = ctx.layout.output();
    let node = ResultNode::from_file(&output.join(&ctx.config.json_status_release_note))?;
    let notes = filesystem::matching_files(output, "release_note_", ".txt")?;
    let workspace = ctx.layout.workspace();
    for note in &notes {
        filesystem::copy_into(note, &workspace)?;
    }
    tracing::info!("Release note generated ({} files)", notes.len());
    Ok(node)
}

/// Generate the workspace `LICENSE` file
pub async fn license_file(ctx: &ReleaseContext) -> Result<(), ReleaseError> {
    let script = tool_path(ctx, ctx.config.tools.licenses.as_ref(), "licenses")?;
    let workspace = ctx.layout.workspace();
    // The workspace is the top so only the copied sources are scanned
    let cmd = CommandLine::new(script.display().to_string())
        .arg("--top")
        .arg(workspace.display().to_string())
        .arg("--output")
        .arg(workspace.join("LICENSE").display().to_string())
        .arg("--previous")
        .arg(&ctx.config.friendly_name_prv)
        .arg("--current")
        .arg(&ctx.config.friendly_name_cur);
    ctx.runner.run(&cmd, Some("licenses")).await?;
    Ok(())
}

/// A third-party manifest shipped with an installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalManifest {
    /// `manifest.csv` path
    pub path: PathBuf,
    /// Package name the manifest belongs to
    pub version: String,
}

/// Manifests covering the binaries of one preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseManifests {
    /// BSP SDK manifest
    pub bsp: Option<LegalManifest>,
    /// Toolchain manifest
    pub toolchain: LegalManifest,
}

impl LicenseManifests {
    /// Locate the manifests of a preset's installed packages
    pub fn for_preset(ctx: &ReleaseContext, preset: &Preset, packages: &ResolvedPackages) -> Self {
        let root = ctx.installer.sdk_root();
        let legal = preset.legal.as_deref().unwrap_or("legal-info");
        let toolchain_name = packages.toolchain.name.clone();

        match (&packages.brsdk, preset.legal.as_deref()) {
            (Some(brsdk), Some(_)) => {
                let arch = preset.brsdk_arch.as_deref().unwrap_or_default();
                Self {
                    bsp: Some(LegalManifest {
                        path: root.join(&brsdk.name).join(legal).join("manifest.csv"),
                        version: brsdk.name.clone(),
                    }),
                    toolchain: LegalManifest {
                        path: root
                            .join(&toolchain_name)
                            .join(arch)
                            .join("legal-info")
                            .join("manifest.csv"),
                        version: toolchain_name,
                    },
                }
            }
            _ => Self {
                bsp: None,
                toolchain: LegalManifest {
                    path: root.join(&toolchain_name).join(legal).join("manifest.csv"),
                    version: toolchain_name,
                },
            },
        }
    }
}

/// Generate the license manifest of one preset's binaries
pub async fn binary_licenses(
    ctx: &ReleaseContext,
    name: &str,
    preset: &Preset,
    packages: &ResolvedPackages,
) -> Result<(), ReleaseError> {
    let script = tool_path(ctx, ctx.config.tools.licenses.as_ref(), "licenses")?;
    let workspace = ctx.layout.workspace();
    let odir = workspace.join(WorkspaceLayout::preset_dir(name));
    let manifests = LicenseManifests::for_preset(ctx, preset, packages);

    let mut cmd = CommandLine::new(script.display().to_string())
        .arg("--binaries")
        .arg(odir.display().to_string())
        .arg("--preset")
        .arg(name)
        .arg("--output")
        .arg(odir.join("licenses.txt").display().to_string());
    if let Some(bsp) = &manifests.bsp {
        cmd = cmd
            .arg("--bsp-manifest")
            .arg(bsp.path.display().to_string())
            .arg("--bsp-version")
            .arg(&bsp.version);
    }
    cmd = cmd
        .arg("--toolchain-manifest")
        .arg(manifests.toolchain.path.display().to_string())
        .arg("--toolchain-version")
        .arg(&manifests.toolchain.version)
        .arg("--release")
        .arg(&ctx.config.friendly_name_cur);
    ctx.runner.run(&cmd, Some(name)).await?;
    Ok(())
}
